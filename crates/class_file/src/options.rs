/// Switches for data the decoder can read but drops by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Keep the raw instruction bytes of every `Code` attribute.
    pub capture_raw_bytecode: bool,
    /// Keep `LocalVariableTable` records, resolved to names and descriptors.
    pub capture_local_variable_tables: bool,
    /// Reject every constant pool tag outside the classic set. When disabled,
    /// `Dynamic`, `Module` and `Package` entries are accepted; tags of unknown
    /// width still fail.
    pub fail_fast_on_unknown_tag: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            capture_raw_bytecode: false,
            capture_local_variable_tables: false,
            fail_fast_on_unknown_tag: true,
        }
    }
}
