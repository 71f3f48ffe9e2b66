use crate::{
    attributes::{Attribute, AttributeDecoder, AttributeValue},
    class_file::{ClassField, ClassMethod},
    constant_pool::*,
    cursor::ByteCursor,
    error::ConstantPoolDefect,
    AccessFlags, ClassFile, ClassFileError, ConstantPool, DecodeError, DecodeOptions,
    Result,
};

const MAGIC: u32 = 0xCAFEBABE;

/// Decodes one class file, phase by phase, from a byte slice.
pub struct Parser<'a> {
    r: ByteCursor<'a>,
    options: &'a DecodeOptions,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8], options: &'a DecodeOptions) -> Self {
        Self {
            r: ByteCursor::new(buf),
            options,
        }
    }

    /// Runs a full decode. Failures carry `origin` and the byte offset they
    /// were detected at.
    pub fn parse(mut self, origin: &str) -> Result<ClassFile, DecodeError> {
        let size = self.r.remaining() as u64;
        self.parse_class_file(origin, size).map_err(|error| DecodeError {
            entry_name: origin.to_owned(),
            offset: error.offset().unwrap_or_else(|| self.r.position()),
            error,
        })
    }

    fn parse_class_file(&mut self, origin: &str, size: u64) -> Result<ClassFile> {
        self.parse_magic_identifier()?;
        let (minor_version, major_version) = self.parse_version()?;
        log::trace!("{}: version {}.{}", origin, major_version, minor_version);

        let constant_pool = self.parse_constant_pool()?;
        log::trace!("{}: {} constant pool slots", origin, constant_pool.len());

        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let name = self
            .r
            .read_index_with(|index| constant_pool.resolve_class_name(index))?;

        // If the value of the super_class item is zero, then this class file must represent
        // the class Object, the only class or interface without a direct superclass.
        let super_class = self.r.read_index_with(|index| match index {
            0 => Ok(None),
            index => constant_pool.resolve_class_name(index).map(Some),
        })?;

        let interfaces_count = self.r.read_u16()?;
        let interfaces = (0..interfaces_count)
            .map(|_| {
                self.r
                    .read_index_with(|index| constant_pool.resolve_class_name(index))
            })
            .collect::<Result<Vec<_>>>()?;

        let decoder = AttributeDecoder::new(&constant_pool, self.options);

        let fields_count = self.r.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| self.parse_field_info(&constant_pool, &decoder))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.r.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| self.parse_method_info(&constant_pool, &decoder))
            .collect::<Result<Vec<_>>>()?;

        let mut attributes = Vec::new();
        let mut source_file = None;
        for Attribute { name, value } in decoder.decode_all(&mut self.r)? {
            if let AttributeValue::SourceFile(s) = value {
                source_file = Some(s);
            }
            attributes.push(name);
        }

        let bytes_consumed = self.r.position();
        if !self.r.is_empty() {
            log::warn!(
                "{}: ignoring {} trailing bytes after offset {}",
                origin,
                self.r.remaining(),
                bytes_consumed
            );
        }

        let referenced_classes = constant_pool.referenced_classes()?;
        log::debug!(
            "{}: decoded {} ({} fields, {} methods, {} referenced classes)",
            origin,
            name,
            fields.len(),
            methods.len(),
            referenced_classes.len()
        );

        Ok(ClassFile {
            name,
            super_class,
            size,
            origin: origin.to_owned(),
            minor_version,
            major_version,
            access_flags,
            interfaces,
            fields,
            methods,
            attributes,
            source_file,
            referenced_classes,
            bytes_consumed,
        })
    }

    fn parse_field_info(
        &mut self,
        constant_pool: &ConstantPool,
        decoder: &AttributeDecoder,
    ) -> Result<ClassField> {
        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let name = self.read_utf8_index(constant_pool)?;
        let descriptor = self.read_utf8_index(constant_pool)?;

        let mut attributes = Vec::new();
        let mut constant_value = None;
        for Attribute { name, value } in decoder.decode_all(&mut self.r)? {
            if let AttributeValue::ConstantValue(value) = value {
                constant_value = Some(value);
            }
            attributes.push(name);
        }

        Ok(ClassField {
            access_flags,
            name,
            descriptor,
            attributes,
            constant_value,
        })
    }

    fn parse_method_info(
        &mut self,
        constant_pool: &ConstantPool,
        decoder: &AttributeDecoder,
    ) -> Result<ClassMethod> {
        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let name = self.read_utf8_index(constant_pool)?;
        let descriptor = self.read_utf8_index(constant_pool)?;

        let mut attributes = Vec::new();
        let mut code = None;
        for Attribute { name, value } in decoder.decode_all(&mut self.r)? {
            if let AttributeValue::Code(c) = value {
                code = Some(c);
            }
            attributes.push(name);
        }

        Ok(ClassMethod {
            access_flags,
            name,
            descriptor,
            attributes,
            code,
        })
    }

    fn read_utf8_index(&mut self, constant_pool: &ConstantPool) -> Result<String> {
        self.r
            .read_index_with(|index| constant_pool.resolve_utf8(index).map(str::to_owned))
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.r.read_u32()? {
            MAGIC => Ok(()),
            magic_identifier => Err(ClassFileError::MalformedHeader(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.r.read_u16()?;
        let major = self.r.read_u16()?;
        Ok((minor, major))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let start = self.r.position();
        let constant_pool_count = self.r.read_u16()?;
        if constant_pool_count == 0 {
            return Err(ClassFileError::MalformedConstantPool {
                offset: start,
                reason: ConstantPoolDefect::EmptyPool,
            });
        }

        let slots = constant_pool_count as usize - 1;
        let mut res = Vec::with_capacity(slots);
        while res.len() < slots {
            let offset = self.r.position();
            let entry = match self.parse_cp_info() {
                Ok(entry) => entry,
                // The declared count promised more entries than the file holds.
                Err(ClassFileError::TruncatedInput { .. }) => {
                    return Err(ClassFileError::MalformedConstantPool {
                        offset,
                        reason: ConstantPoolDefect::CountMismatch {
                            declared: constant_pool_count,
                            produced: res.len(),
                        },
                    })
                }
                Err(e) => return Err(e),
            };

            if entry.is_double_slot() {
                if res.len() + 2 > slots {
                    return Err(ClassFileError::MalformedConstantPool {
                        offset,
                        reason: ConstantPoolDefect::DoubleSlotOverflow {
                            index: res.len() as u16 + 1,
                        },
                    });
                }
                res.push(entry);
                res.push(ConstantPoolEntry::Unusable);
            } else {
                res.push(entry);
            }
        }

        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self) -> Result<ConstantPoolEntry> {
        let offset = self.r.position();
        let tag = self.r.read_u8()?;
        let cp_info = match tag {
            CONSTANT_UTF8 => self.parse_utf8()?,
            CONSTANT_INTEGER => ConstantPoolEntry::Integer(self.r.read_u32()?),
            CONSTANT_FLOAT => ConstantPoolEntry::Float(self.r.read_u32()?),
            CONSTANT_LONG => ConstantPoolEntry::Long {
                high: self.r.read_u32()?,
                low: self.r.read_u32()?,
            },
            CONSTANT_DOUBLE => ConstantPoolEntry::Double {
                high: self.r.read_u32()?,
                low: self.r.read_u32()?,
            },
            CONSTANT_CLASS => ConstantPoolEntry::ClassRef {
                name_index: self.r.read_u16()?,
            },
            CONSTANT_STRING => ConstantPoolEntry::StringRef {
                utf8_index: self.r.read_u16()?,
            },
            CONSTANT_FIELD_REF => ConstantPoolEntry::FieldRef(self.parse_ref_info()?),
            CONSTANT_METHOD_REF => ConstantPoolEntry::MethodRef(self.parse_ref_info()?),
            CONSTANT_INTERFACE_METHOD_REF => {
                ConstantPoolEntry::InterfaceMethodRef(self.parse_ref_info()?)
            }
            CONSTANT_NAME_AND_TYPE => ConstantPoolEntry::NameAndType(NameAndTypeInfo {
                name_index: self.r.read_u16()?,
                descriptor_index: self.r.read_u16()?,
            }),
            CONSTANT_METHOD_HANDLE => ConstantPoolEntry::MethodHandle(MethodHandleInfo {
                reference_kind: self.r.read_u8()?,
                reference_index: self.r.read_u16()?,
            }),
            CONSTANT_METHOD_TYPE => ConstantPoolEntry::MethodType {
                descriptor_index: self.r.read_u16()?,
            },
            CONSTANT_INVOKE_DYNAMIC => {
                ConstantPoolEntry::InvokeDynamic(self.parse_invoke_dynamic_info()?)
            }
            CONSTANT_DYNAMIC if !self.options.fail_fast_on_unknown_tag => {
                ConstantPoolEntry::Dynamic(self.parse_invoke_dynamic_info()?)
            }
            CONSTANT_MODULE if !self.options.fail_fast_on_unknown_tag => {
                ConstantPoolEntry::Module {
                    name_index: self.r.read_u16()?,
                }
            }
            CONSTANT_PACKAGE if !self.options.fail_fast_on_unknown_tag => {
                ConstantPoolEntry::Package {
                    name_index: self.r.read_u16()?,
                }
            }
            _ => {
                return Err(ClassFileError::MalformedConstantPool {
                    offset,
                    reason: ConstantPoolDefect::UnknownTag(tag),
                })
            }
        };

        Ok(cp_info)
    }

    fn parse_utf8(&mut self) -> Result<ConstantPoolEntry> {
        let length = self.r.read_u16()?;
        let bytes = self.r.read_bytes(length as usize)?;

        let s = match cesu8::from_java_cesu8(bytes) {
            Ok(s) => s,
            Err(_) => {
                log::warn!(
                    "Invalid modified UTF-8 at offset {}, decoding lossily",
                    self.r.position() - bytes.len()
                );
                String::from_utf8_lossy(bytes)
            }
        };

        Ok(ConstantPoolEntry::Utf8(s.into_owned()))
    }

    fn parse_invoke_dynamic_info(&mut self) -> Result<InvokeDynamicInfo> {
        let bootstrap_method_attr_index = self.r.read_u16()?;
        let name_and_type_index = self.r.read_u16()?;

        Ok(InvokeDynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.r.read_u16()?;
        let name_and_type_index = self.r.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }
}
