//! Assembles class files byte by byte for tests.

#![allow(dead_code)]

#[derive(Default)]
pub struct ConstantPoolBuilder {
    bytes: Vec<u8>,
    slots: u16,
}

impl ConstantPoolBuilder {
    /// Appends a raw entry and returns its index.
    pub fn raw(&mut self, tag: u8, payload: &[u8], slots: u16) -> u16 {
        self.bytes.push(tag);
        self.bytes.extend_from_slice(payload);
        let index = self.slots + 1;
        self.slots += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        let mut payload = (s.len() as u16).to_be_bytes().to_vec();
        payload.extend_from_slice(s.as_bytes());
        self.raw(1, &payload, 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.raw(3, &value.to_be_bytes(), 1)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.raw(4, &value.to_bits().to_be_bytes(), 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.raw(5, &value.to_be_bytes(), 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.raw(6, &value.to_bits().to_be_bytes(), 2)
    }

    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        self.raw(7, &name_index.to_be_bytes(), 1)
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let utf8_index = self.utf8(s);
        self.raw(8, &utf8_index.to_be_bytes(), 1)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let name_and_type = self.raw(12, &pair(name_index, descriptor_index), 1);
        self.raw(10, &pair(class_index, name_and_type), 1)
    }

    /// `constant_pool_count` followed by the entries.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = (self.slots + 1).to_be_bytes().to_vec();
        out.extend_from_slice(&self.bytes);
        out
    }
}

fn pair(a: u16, b: u16) -> [u8; 4] {
    let [a0, a1] = a.to_be_bytes();
    let [b0, b1] = b.to_be_bytes();
    [a0, a1, b0, b1]
}

pub struct ClassBuilder {
    pub cp: ConstantPoolBuilder,
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    pub fn new(internal_name: &str, super_name: Option<&str>) -> Self {
        let mut cp = ConstantPoolBuilder::default();
        let this_class = cp.class(internal_name);
        let super_class = super_name.map(|s| cp.class(s)).unwrap_or(0);

        Self {
            cp,
            minor_version: 0,
            major_version: 52,
            access_flags: 0x0021,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn interface(&mut self, internal_name: &str) -> &mut Self {
        let index = self.cp.class(internal_name);
        self.interfaces.push(index);
        self
    }

    /// Encodes an attribute whose declared length matches its payload.
    pub fn attribute(&mut self, name: &str, payload: &[u8]) -> Vec<u8> {
        self.attribute_with_length(name, payload, payload.len() as u32)
    }

    pub fn attribute_with_length(&mut self, name: &str, payload: &[u8], length: u32) -> Vec<u8> {
        let name_index = self.cp.utf8(name);
        let mut out = name_index.to_be_bytes().to_vec();
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    pub fn source_file(&mut self, file_name: &str) -> &mut Self {
        let index = self.cp.utf8(file_name);
        let attribute = self.attribute("SourceFile", &index.to_be_bytes());
        self.attributes.push(attribute);
        self
    }

    pub fn class_attribute(&mut self, attribute: Vec<u8>) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    pub fn field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> &mut Self {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.fields.push(member);
        self
    }

    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> &mut Self {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.methods.push(member);
        self
    }

    /// Encodes a `Code` attribute.
    pub fn code(
        &mut self,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
        exception_table: &[[u16; 4]],
        attributes: Vec<Vec<u8>>,
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&max_stack.to_be_bytes());
        payload.extend_from_slice(&max_locals.to_be_bytes());
        payload.extend_from_slice(&(code.len() as u32).to_be_bytes());
        payload.extend_from_slice(code);
        payload.extend_from_slice(&(exception_table.len() as u16).to_be_bytes());
        for record in exception_table {
            for value in record {
                payload.extend_from_slice(&value.to_be_bytes());
            }
        }
        push_list(&mut payload, &attributes);
        self.attribute("Code", &payload)
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> Vec<u8> {
        let name_index = self.cp.utf8(name);
        let descriptor_index = self.cp.utf8(descriptor);
        let mut out = access_flags.to_be_bytes().to_vec();
        out.extend_from_slice(&pair(name_index, descriptor_index));
        push_list(&mut out, &attributes);
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0xca, 0xfe, 0xba, 0xbe];
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());
        out.extend_from_slice(&self.cp.encode());
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&pair(self.this_class, self.super_class));
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            out.extend_from_slice(&interface.to_be_bytes());
        }
        push_list(&mut out, &self.fields);
        push_list(&mut out, &self.methods);
        push_list(&mut out, &self.attributes);
        out
    }
}

fn push_list(out: &mut Vec<u8>, items: &[Vec<u8>]) {
    out.extend_from_slice(&(items.len() as u16).to_be_bytes());
    for item in items {
        out.extend_from_slice(item);
    }
}

/// `class Example extends Object {}` with a `SourceFile` attribute.
pub fn example_class() -> Vec<u8> {
    let mut class = ClassBuilder::new("Example", Some("java/lang/Object"));
    class.source_file("Example.java");
    class.build()
}
