use std::collections::BTreeSet;

use crate::{
    error::IndexDefect, names::canonical_name, ClassFileError, ConstantValue, Result,
};

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELD_REF: u8 = 9;
pub const CONSTANT_METHOD_REF: u8 = 10;
pub const CONSTANT_INTERFACE_METHOD_REF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

/// The 1-indexed constant pool of a single class file.
///
/// Slot `i` lives at `entries[i - 1]`. The slot after every `Long` and
/// `Double` holds [`ConstantPoolEntry::Unusable`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstantPool {
    entries: Vec<ConstantPoolEntry>,
}

/// Fetches the entry at `$index` and destructures it as variant `$variant`,
/// or fails with `InvalidConstantPoolIndex`.
macro_rules! expect_entry {
    ($cp:expr, $index:expr, $variant:ident $fields:tt) => {{
        let index = $index;
        match $cp.get(index)? {
            crate::constant_pool::ConstantPoolEntry::$variant $fields => Ok($fields),
            found => Err(crate::ClassFileError::InvalidConstantPoolIndex {
                index,
                offset: None,
                reason: crate::error::IndexDefect::UnexpectedEntry {
                    expected: stringify!($variant),
                    found: found.kind_name(),
                },
            }),
        }
    }};
}

impl ConstantPool {
    pub fn new(entries: Vec<ConstantPoolEntry>) -> Self {
        Self { entries }
    }

    /// Number of slots, placeholders included. Valid indices are `1..=len()`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&ConstantPoolEntry> {
        let invalid = |reason| ClassFileError::InvalidConstantPoolIndex {
            index,
            offset: None,
            reason,
        };

        if index == 0 {
            return Err(invalid(IndexDefect::Zero));
        }
        match self.entries.get(index as usize - 1) {
            None => Err(invalid(IndexDefect::OutOfRange {
                len: self.entries.len(),
            })),
            Some(ConstantPoolEntry::Unusable) => Err(invalid(IndexDefect::Unusable)),
            Some(entry) => Ok(entry),
        }
    }

    pub fn resolve_utf8(&self, index: u16) -> Result<&str> {
        expect_entry!(self, index, Utf8(s)).map(String::as_str)
    }

    /// Internal (`/`-separated) name of the class referenced by a `ClassRef`.
    pub fn resolve_class_ref(&self, index: u16) -> Result<&str> {
        let name_index = expect_entry!(self, index, ClassRef { name_index })?;
        self.resolve_utf8(*name_index)
    }

    /// Canonical dotted name of the class referenced by a `ClassRef`.
    pub fn resolve_class_name(&self, index: u16) -> Result<String> {
        self.resolve_class_ref(index).map(canonical_name)
    }

    pub fn resolve_string(&self, index: u16) -> Result<&str> {
        let utf8_index = expect_entry!(self, index, StringRef { utf8_index })?;
        self.resolve_utf8(*utf8_index)
    }

    /// Resolves the target of a `ConstantValue` attribute.
    pub fn resolve_constant_value(&self, index: u16) -> Result<ConstantValue> {
        match self.get(index)? {
            ConstantPoolEntry::Integer(bits) => Ok(ConstantValue::Integer(*bits as i32)),
            ConstantPoolEntry::Float(bits) => Ok(ConstantValue::Float(f32::from_bits(*bits))),
            ConstantPoolEntry::Long { high, low } => {
                Ok(ConstantValue::Long(join_u32(*high, *low) as i64))
            }
            ConstantPoolEntry::Double { high, low } => {
                Ok(ConstantValue::Double(f64::from_bits(join_u32(*high, *low))))
            }
            ConstantPoolEntry::StringRef { .. } => {
                Ok(ConstantValue::String(self.resolve_string(index)?.to_owned()))
            }
            found => Err(ClassFileError::InvalidConstantPoolIndex {
                index,
                offset: None,
                reason: IndexDefect::UnexpectedEntry {
                    expected: "constant value",
                    found: found.kind_name(),
                },
            }),
        }
    }

    /// Every distinct class named by a `ClassRef` entry, in canonical form.
    pub fn referenced_classes(&self) -> Result<BTreeSet<String>> {
        self.iter()
            .filter(|(_, entry)| matches!(entry, ConstantPoolEntry::ClassRef { .. }))
            .map(|(index, _)| self.resolve_class_name(index))
            .collect()
    }

    /// `(index, entry)` pairs, skipping placeholder slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantPoolEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !matches!(entry, ConstantPoolEntry::Unusable))
            .map(|(i, entry)| (i as u16 + 1, entry))
    }
}

fn join_u32(high: u32, low: u32) -> u64 {
    (high as u64) << 32 | low as u64
}

#[derive(Debug, PartialEq, Clone)]
pub enum ConstantPoolEntry {
    Utf8(String),
    Integer(u32),
    Float(u32),
    Long { high: u32, low: u32 },
    Double { high: u32, low: u32 },
    ClassRef { name_index: u16 },
    StringRef { utf8_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType { descriptor_index: u16 },
    InvokeDynamic(InvokeDynamicInfo),
    Dynamic(InvokeDynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Second slot of a `Long` or `Double`.
    Unusable,
}

impl ConstantPoolEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstantPoolEntry::Utf8(_) => "Utf8",
            ConstantPoolEntry::Integer(_) => "Integer",
            ConstantPoolEntry::Float(_) => "Float",
            ConstantPoolEntry::Long { .. } => "Long",
            ConstantPoolEntry::Double { .. } => "Double",
            ConstantPoolEntry::ClassRef { .. } => "ClassRef",
            ConstantPoolEntry::StringRef { .. } => "StringRef",
            ConstantPoolEntry::FieldRef(_) => "FieldRef",
            ConstantPoolEntry::MethodRef(_) => "MethodRef",
            ConstantPoolEntry::InterfaceMethodRef(_) => "InterfaceMethodRef",
            ConstantPoolEntry::NameAndType(_) => "NameAndType",
            ConstantPoolEntry::MethodHandle(_) => "MethodHandle",
            ConstantPoolEntry::MethodType { .. } => "MethodType",
            ConstantPoolEntry::InvokeDynamic(_) => "InvokeDynamic",
            ConstantPoolEntry::Dynamic(_) => "Dynamic",
            ConstantPoolEntry::Module { .. } => "Module",
            ConstantPoolEntry::Package { .. } => "Package",
            ConstantPoolEntry::Unusable => "Unusable",
        }
    }

    /// Whether the entry occupies two pool slots.
    pub fn is_double_slot(&self) -> bool {
        matches!(
            self,
            ConstantPoolEntry::Long { .. } | ConstantPoolEntry::Double { .. }
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InvokeDynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[cfg(test)]
mod resolve_tests {
    use super::*;
    use crate::{error::IndexDefect, ErrorKind};

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            /* 1 */ ConstantPoolEntry::Utf8("com/example/Widget".into()),
            /* 2 */ ConstantPoolEntry::ClassRef { name_index: 1 },
            /* 3 */ ConstantPoolEntry::Long { high: 0, low: 42 },
            /* 4 */ ConstantPoolEntry::Unusable,
            /* 5 */ ConstantPoolEntry::Double {
                high: (1.5f64.to_bits() >> 32) as u32,
                low: 1.5f64.to_bits() as u32,
            },
            /* 6 */ ConstantPoolEntry::Unusable,
            /* 7 */ ConstantPoolEntry::StringRef { utf8_index: 8 },
            /* 8 */ ConstantPoolEntry::Utf8("hello".into()),
            /* 9 */ ConstantPoolEntry::Integer(-7i32 as u32),
            /* 10 */ ConstantPoolEntry::ClassRef { name_index: 3 },
            /* 11 */ ConstantPoolEntry::NameAndType(NameAndTypeInfo {
                name_index: 8,
                descriptor_index: 12,
            }),
            /* 12 */ ConstantPoolEntry::Utf8("I".into()),
        ])
    }

    fn defect(result: Result<impl std::fmt::Debug>) -> IndexDefect {
        match result {
            Err(ClassFileError::InvalidConstantPoolIndex { reason, .. }) => reason,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn it_should_resolve_a_class_name_in_canonical_form() {
        let cp = pool();

        assert_eq!(cp.resolve_class_ref(2).unwrap(), "com/example/Widget");
        assert_eq!(cp.resolve_class_name(2).unwrap(), "com.example.Widget");
    }

    #[test]
    fn it_should_reject_index_zero() {
        assert_eq!(defect(pool().resolve_utf8(0)), IndexDefect::Zero);
    }

    #[test]
    fn it_should_reject_an_out_of_range_index() {
        assert_eq!(
            defect(pool().resolve_utf8(13)),
            IndexDefect::OutOfRange { len: 12 }
        );
    }

    #[test]
    fn it_should_reject_the_slot_after_a_long_or_double() {
        let cp = pool();

        assert_eq!(defect(cp.get(4)), IndexDefect::Unusable);
        assert_eq!(defect(cp.resolve_utf8(6)), IndexDefect::Unusable);
        assert_eq!(
            cp.resolve_class_name(4).unwrap_err().kind(),
            ErrorKind::InvalidConstantPoolIndex
        );
    }

    #[test]
    fn it_should_reject_an_entry_of_the_wrong_kind() {
        let cp = pool();

        assert_eq!(
            defect(cp.resolve_utf8(2)),
            IndexDefect::UnexpectedEntry {
                expected: "Utf8",
                found: "ClassRef"
            }
        );
        assert_eq!(
            defect(cp.resolve_class_name(1)),
            IndexDefect::UnexpectedEntry {
                expected: "ClassRef",
                found: "Utf8"
            }
        );
        // ClassRef pointing at a Long instead of a Utf8.
        assert_eq!(
            defect(cp.resolve_class_name(10)),
            IndexDefect::UnexpectedEntry {
                expected: "Utf8",
                found: "Long"
            }
        );
    }

    #[test]
    fn it_should_resolve_constant_values() {
        let cp = pool();

        assert_eq!(cp.resolve_constant_value(3).unwrap(), ConstantValue::Long(42));
        assert_eq!(cp.resolve_constant_value(5).unwrap(), ConstantValue::Double(1.5));
        assert_eq!(
            cp.resolve_constant_value(7).unwrap(),
            ConstantValue::String("hello".into())
        );
        assert_eq!(cp.resolve_constant_value(9).unwrap(), ConstantValue::Integer(-7));
        assert!(cp.resolve_constant_value(1).is_err());
    }

    #[test]
    fn it_should_resolve_a_string() {
        let cp = pool();

        assert_eq!(cp.resolve_string(7).unwrap(), "hello");
        assert_eq!(
            defect(cp.resolve_string(8)),
            IndexDefect::UnexpectedEntry {
                expected: "StringRef",
                found: "Utf8"
            }
        );
    }

    #[test]
    fn it_should_skip_placeholders_when_iterating() {
        let indices = pool().iter().map(|(i, _)| i).collect::<Vec<_>>();

        assert_eq!(indices, vec![1, 2, 3, 5, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn it_should_fail_referenced_classes_on_a_broken_class_ref() {
        // Entry 10 names a Long, so the scan cannot produce a name for it.
        assert!(pool().referenced_classes().is_err());

        let cp = ConstantPool::new(vec![
            ConstantPoolEntry::Utf8("a/B".into()),
            ConstantPoolEntry::ClassRef { name_index: 1 },
            ConstantPoolEntry::ClassRef { name_index: 1 },
        ]);
        assert_eq!(
            cp.referenced_classes().unwrap().into_iter().collect::<Vec<_>>(),
            vec!["a.B".to_owned()]
        );
    }
}
