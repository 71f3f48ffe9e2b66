use std::{collections::BTreeSet, io::Read};

use serde::Serialize;

use crate::{attributes, parser::Parser, AccessFlags, DecodeError, DecodeOptions};

/// Largest buffer [`ClassFile::from_reader`] allocates up front.
pub const MAX_PREALLOCATION: u64 = 1 << 20;

/// The decoded structure of one class file. Every symbolic reference has been
/// resolved, so the model outlives the constant pool it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassFile {
    pub name: String,
    /// `None` only for `java.lang.Object`.
    pub super_class: Option<String>,
    /// Number of bytes in the decoded input, trailing bytes included.
    pub size: u64,
    pub origin: String,
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: AccessFlags,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassField>,
    pub methods: Vec<ClassMethod>,
    pub attributes: Vec<String>,
    pub source_file: Option<String>,
    /// Every class named by a constant pool `ClassRef`, bytecode references
    /// included.
    pub referenced_classes: BTreeSet<String>,
    pub bytes_consumed: usize,
}

impl ClassFile {
    /// Decodes a class file held in memory. `origin` names the source in
    /// diagnostics, usually the archive entry name.
    pub fn decode(
        bytes: &[u8],
        origin: &str,
        options: &DecodeOptions,
    ) -> Result<ClassFile, DecodeError> {
        Parser::new(bytes, options).parse(origin)
    }

    /// Reads a whole stream, then decodes it. `size_hint` is the declared
    /// length of the stream (e.g. the archive entry size); it only sizes the
    /// read buffer, up to [`MAX_PREALLOCATION`] bytes.
    pub fn from_reader(
        mut r: impl Read,
        size_hint: u64,
        origin: &str,
        options: &DecodeOptions,
    ) -> Result<ClassFile, DecodeError> {
        let mut bytes = Vec::with_capacity(size_hint.min(MAX_PREALLOCATION) as usize);
        r.read_to_end(&mut bytes).map_err(|e| DecodeError {
            entry_name: origin.to_owned(),
            offset: bytes.len(),
            error: e.into(),
        })?;

        ClassFile::decode(&bytes, origin, options)
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn field(&self, name: &str) -> Option<&ClassField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All overloads of `name`.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ClassMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassField {
    pub access_flags: AccessFlags,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<String>,
    pub constant_value: Option<ConstantValue>,
}

impl ClassField {
    pub fn is_deprecated(&self) -> bool {
        has_attribute(&self.attributes, attributes::DEPRECATED)
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags.contains(AccessFlags::SYNTHETIC)
            || has_attribute(&self.attributes, attributes::SYNTHETIC)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMethod {
    pub access_flags: AccessFlags,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<String>,
    pub code: Option<Code>,
}

impl ClassMethod {
    pub fn is_deprecated(&self) -> bool {
        has_attribute(&self.attributes, attributes::DEPRECATED)
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags.contains(AccessFlags::SYNTHETIC)
            || has_attribute(&self.attributes, attributes::SYNTHETIC)
    }
}

fn has_attribute(attributes: &[String], name: &str) -> bool {
    attributes.iter().any(|a| a == name)
}

/// Literal attached to a field by its `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
}

/// What is kept of a method's `Code` attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_length: u32,
    /// Raw instruction bytes, present only when capture is enabled.
    pub bytecode: Option<Vec<u8>>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<String>,
    pub local_variables: Vec<LocalVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Canonical name of the caught class; `None` catches everything.
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name: String,
    pub descriptor: String,
    pub index: u16,
}
