// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.7

use crate::{
    class_file::{Code, ConstantValue, ExceptionTableEntry, LocalVariable},
    cursor::ByteCursor,
    ClassFileError, ConstantPool, DecodeOptions, Result,
};

pub const CODE: &str = "Code";
pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const SOURCE_FILE: &str = "SourceFile";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const EXCEPTIONS: &str = "Exceptions";
pub const SYNTHETIC: &str = "Synthetic";
pub const DEPRECATED: &str = "Deprecated";

#[derive(Debug, PartialEq)]
pub(crate) struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// The part of an attribute that survives decoding. Attributes that are only
/// measured and skipped keep nothing but their name.
#[derive(Debug, PartialEq)]
pub(crate) enum AttributeValue {
    Code(Code),
    ConstantValue(ConstantValue),
    SourceFile(String),
    LocalVariableTable(Vec<LocalVariable>),
    Skipped,
}

/// Decodes attribute lists against one constant pool.
pub(crate) struct AttributeDecoder<'a> {
    constant_pool: &'a ConstantPool,
    options: &'a DecodeOptions,
}

impl<'a> AttributeDecoder<'a> {
    pub fn new(constant_pool: &'a ConstantPool, options: &'a DecodeOptions) -> Self {
        Self {
            constant_pool,
            options,
        }
    }

    /// Reads `attributes_count` followed by that many attributes.
    pub fn decode_all(&self, r: &mut ByteCursor) -> Result<Vec<Attribute>> {
        let attributes_count = r.read_u16()?;
        (0..attributes_count).map(|_| self.decode(r)).collect()
    }

    /// Decodes one attribute. The payload is read through a cursor bounded to
    /// the declared length, which must be consumed exactly.
    pub fn decode(&self, r: &mut ByteCursor) -> Result<Attribute> {
        let name = self.read_utf8_index(r)?;
        let length = r.read_u32()?;
        let mut payload = r.sub_cursor(length as usize)?;
        let start = payload.position();

        let value = match self.decode_payload(&name, &mut payload) {
            Ok(value) => value,
            Err(ClassFileError::TruncatedInput { offset, needed, .. }) => {
                return Err(ClassFileError::MalformedAttribute {
                    name,
                    offset: start,
                    declared: length,
                    consumed: offset - start + needed,
                })
            }
            Err(e) => return Err(e),
        };

        if !payload.is_empty() {
            return Err(ClassFileError::MalformedAttribute {
                name,
                offset: start,
                declared: length,
                consumed: payload.position() - start,
            });
        }

        Ok(Attribute { name, value })
    }

    fn read_utf8_index(&self, r: &mut ByteCursor) -> Result<String> {
        r.read_index_with(|index| self.constant_pool.resolve_utf8(index).map(str::to_owned))
    }

    fn decode_payload(&self, name: &str, r: &mut ByteCursor) -> Result<AttributeValue> {
        let value = match name {
            CODE => AttributeValue::Code(self.decode_code(r)?),
            LINE_NUMBER_TABLE => {
                skip_table(r, 4)?;
                AttributeValue::Skipped
            }
            LOCAL_VARIABLE_TABLE => {
                AttributeValue::LocalVariableTable(self.decode_local_variable_table(r)?)
            }
            CONSTANT_VALUE => AttributeValue::ConstantValue(
                r.read_index_with(|index| self.constant_pool.resolve_constant_value(index))?,
            ),
            SOURCE_FILE => AttributeValue::SourceFile(self.read_utf8_index(r)?),
            // inner_class_info_index, outer_class_info_index, inner_name_index,
            // inner_class_access_flags
            INNER_CLASSES => {
                skip_table(r, 8)?;
                AttributeValue::Skipped
            }
            EXCEPTIONS => {
                skip_table(r, 2)?;
                AttributeValue::Skipped
            }
            SYNTHETIC | DEPRECATED => AttributeValue::Skipped,
            _ => {
                log::debug!("Skipping attribute {} ({} bytes)", name, r.remaining());
                r.skip(r.remaining())?;
                AttributeValue::Skipped
            }
        };

        Ok(value)
    }

    fn decode_code(&self, r: &mut ByteCursor) -> Result<Code> {
        let max_stack = r.read_u16()?;
        let max_locals = r.read_u16()?;
        let code_length = r.read_u32()?;
        let code = r.read_bytes(code_length as usize)?;
        let bytecode = self.options.capture_raw_bytecode.then(|| code.to_vec());

        let exception_table_length = r.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.decode_exception_table_entry(r))
            .collect::<Result<Vec<_>>>()?;

        let mut attributes = Vec::new();
        let mut local_variables = Vec::new();
        for attribute in self.decode_all(r)? {
            if let AttributeValue::LocalVariableTable(table) = attribute.value {
                local_variables.extend(table);
            }
            attributes.push(attribute.name);
        }

        Ok(Code {
            max_stack,
            max_locals,
            code_length,
            bytecode,
            exception_table,
            attributes,
            local_variables,
        })
    }

    fn decode_exception_table_entry(&self, r: &mut ByteCursor) -> Result<ExceptionTableEntry> {
        let start_pc = r.read_u16()?;
        let end_pc = r.read_u16()?;
        let handler_pc = r.read_u16()?;
        let catch_type = r.read_index_with(|index| match index {
            0 => Ok(None),
            index => self.constant_pool.resolve_class_name(index).map(Some),
        })?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    fn decode_local_variable_table(&self, r: &mut ByteCursor) -> Result<Vec<LocalVariable>> {
        let local_variable_table_length = r.read_u16()?;
        let mut table = Vec::new();
        for _ in 0..local_variable_table_length {
            if !self.options.capture_local_variable_tables {
                r.skip(10)?;
                continue;
            }

            table.push(LocalVariable {
                start_pc: r.read_u16()?,
                length: r.read_u16()?,
                name: self.read_utf8_index(r)?,
                descriptor: self.read_utf8_index(r)?,
                index: r.read_u16()?,
            });
        }

        Ok(table)
    }
}

/// Skips a `u16`-counted table of fixed-size records.
fn skip_table(r: &mut ByteCursor, record_size: usize) -> Result<()> {
    let count = r.read_u16()? as usize;
    r.skip(count * record_size)
}
