use bitflags::bitflags;
use serde::{Serialize, Serializer};

bitflags! {
    /// Access flags of a class, field or method. Some bits mean different
    /// things depending on where they appear, hence the aliases.
    #[derive(Default)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

const MODIFIERS: [(AccessFlags, &str); 7] = [
    (AccessFlags::PUBLIC, "public"),
    (AccessFlags::PRIVATE, "private"),
    (AccessFlags::PROTECTED, "protected"),
    (AccessFlags::STATIC, "static"),
    (AccessFlags::FINAL, "final"),
    (AccessFlags::ABSTRACT, "abstract"),
    (AccessFlags::NATIVE, "native"),
];

impl AccessFlags {
    /// Source-level modifier keywords whose meaning does not depend on context.
    pub fn modifiers(&self) -> Vec<&'static str> {
        MODIFIERS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl Serialize for AccessFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.bits())
    }
}

#[cfg(test)]
mod modifiers_tests {
    use super::*;

    #[test]
    fn it_should_list_modifiers_in_source_order() {
        let flags = AccessFlags::from_bits_truncate(0x0019);

        assert_eq!(flags.modifiers(), vec!["public", "static", "final"]);
    }

    #[test]
    fn it_should_ignore_context_dependent_bits() {
        assert!(AccessFlags::SUPER.modifiers().is_empty());
    }
}
