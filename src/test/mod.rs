//! Test helpers: a builder for minimal .NET PE images and factories for module definitions.

pub mod factories;

use std::collections::HashMap;

use crate::metadata::{cor20header::COMIMAGE_FLAGS_ILONLY, root::CIL_HEADER_MAGIC};

const PE_OFFSET: usize = 0x80;
const FILE_ALIGNMENT: usize = 0x200;
const SECTION_RVA: usize = 0x2000;
const CLR_OFFSET: usize = 8;
const METADATA_OFFSET: usize = 0x50;
const VERSION: &[u8; 12] = b"v4.0.30319\0\0";

// `FIELD I4` and `HASTHIS void ()`
const FIELD_SIGNATURE: u16 = 1;
const METHOD_SIGNATURE: u16 = 4;
const BLOB_HEAP: [u8; 8] = [0x00, 0x02, 0x06, 0x08, 0x03, 0x20, 0x00, 0x01];

enum Extends {
    None,
    Ref(String, String),
    Def(u32),
    Spec,
}

/// One `TypeDef` row with its fields and methods.
pub struct TypeBuilder {
    namespace: String,
    name: String,
    flags: u32,
    extends: Extends,
    enclosing: Option<u32>,
    fields: Vec<(String, u16)>,
    methods: Vec<(String, u16)>,
}

impl TypeBuilder {
    /// A public class deriving from `System.Object`.
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeBuilder {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags: 0x0010_0001,
            extends: Extends::Ref("System".into(), "Object".into()),
            enclosing: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public interface.
    pub fn interface(namespace: &str, name: &str) -> Self {
        TypeBuilder {
            flags: 0x0000_00A1,
            extends: Extends::None,
            ..Self::class(namespace, name)
        }
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Derive from a type referenced through `TypeRef`.
    pub fn extends_ref(mut self, namespace: &str, name: &str) -> Self {
        self.extends = Extends::Ref(namespace.to_string(), name.to_string());
        self
    }

    /// Derive from the `TypeDef` row `rid`.
    pub fn extends_def(mut self, rid: u32) -> Self {
        self.extends = Extends::Def(rid);
        self
    }

    /// Derive from a fresh `TypeSpec` row.
    pub fn extends_spec(mut self) -> Self {
        self.extends = Extends::Spec;
        self
    }

    /// Nest inside the `TypeDef` row `rid`; the namespace is dropped.
    pub fn nested_in(mut self, rid: u32) -> Self {
        self.namespace.clear();
        self.enclosing = Some(rid);
        self
    }

    pub fn field(mut self, name: &str, flags: u16) -> Self {
        self.fields.push((name.to_string(), flags));
        self
    }

    pub fn method(mut self, name: &str, flags: u16) -> Self {
        self.methods.push((name.to_string(), flags));
        self
    }
}

/// Builds a PE32 image with one `.text` section holding a CLR header and metadata.
///
/// `<Module>` is always `TypeDef` row 1, so the first added type is row 2.
pub struct CilImageBuilder {
    types: Vec<TypeBuilder>,
    uncompressed: bool,
    reverse_pointers: bool,
    strong_name_signed: bool,
    with_clr: bool,
}

#[derive(Default)]
struct StringHeap {
    data: Vec<u8>,
    index: HashMap<String, u16>,
}

impl StringHeap {
    fn new() -> Self {
        let mut heap = StringHeap::default();
        heap.data.push(0);
        heap.index.insert(String::new(), 0);
        heap
    }

    fn add(&mut self, value: &str) -> u16 {
        if let Some(index) = self.index.get(value) {
            return *index;
        }

        let index = u16::try_from(self.data.len()).unwrap();
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.index.insert(value.to_string(), index);
        index
    }
}

fn push_u16(data: &mut Vec<u8>, value: u16) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn pad4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

impl Default for CilImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CilImageBuilder {
    pub fn new() -> Self {
        CilImageBuilder {
            types: Vec::new(),
            uncompressed: false,
            reverse_pointers: false,
            strong_name_signed: false,
            with_clr: true,
        }
    }

    pub fn type_def(mut self, ty: TypeBuilder) -> Self {
        self.types.push(ty);
        self
    }

    /// Name the tables stream `#-`.
    pub fn uncompressed(mut self) -> Self {
        self.uncompressed = true;
        self
    }

    /// Emit `FieldPtr` / `MethodPtr` tables listing the members in reverse order.
    pub fn reverse_pointers(mut self) -> Self {
        self.reverse_pointers = true;
        self
    }

    pub fn strong_name_signed(mut self) -> Self {
        self.strong_name_signed = true;
        self
    }

    /// Leave the CLR runtime header directory empty.
    pub fn without_clr(mut self) -> Self {
        self.with_clr = false;
        self
    }

    fn tables_stream(&self, strings: &mut StringHeap) -> Vec<u8> {
        let mut typerefs: Vec<(u16, u16)> = Vec::new();
        let mut typespecs = 0_u16;
        let mut typedefs = Vec::new();
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut nested = Vec::new();

        let module_name = strings.add("Test.dll");
        let module = strings.add("<Module>");
        typedefs.push((0_u32, module, 0_u16, 0_u16, 1_u16, 1_u16));

        for (index, ty) in self.types.iter().enumerate() {
            let name = strings.add(&ty.name);
            let namespace = strings.add(&ty.namespace);

            // TypeDefOrRef: TypeDef = 0, TypeRef = 1, TypeSpec = 2
            let extends = match &ty.extends {
                Extends::None => 0,
                Extends::Def(rid) => u16::try_from(*rid).unwrap() << 2,
                Extends::Ref(ns, name) => {
                    let entry = (strings.add(name), strings.add(ns));
                    let rid = match typerefs.iter().position(|existing| *existing == entry) {
                        Some(position) => position + 1,
                        None => {
                            typerefs.push(entry);
                            typerefs.len()
                        }
                    };
                    (u16::try_from(rid).unwrap() << 2) | 1
                }
                Extends::Spec => {
                    typespecs += 1;
                    (typespecs << 2) | 2
                }
            };

            let field_list = u16::try_from(fields.len() + 1).unwrap();
            let method_list = u16::try_from(methods.len() + 1).unwrap();
            typedefs.push((ty.flags, name, namespace, extends, field_list, method_list));

            for (field, flags) in &ty.fields {
                fields.push((*flags, strings.add(field)));
            }
            for (method, flags) in &ty.methods {
                methods.push((*flags, strings.add(method)));
            }

            if let Some(enclosing) = ty.enclosing {
                nested.push((u16::try_from(index + 2).unwrap(), u16::try_from(enclosing).unwrap()));
            }
        }
        nested.sort_unstable();

        let counts: [(u8, usize); 9] = [
            (0x00, 1),
            (0x01, typerefs.len()),
            (0x02, typedefs.len()),
            (0x03, if self.reverse_pointers { fields.len() } else { 0 }),
            (0x04, fields.len()),
            (0x05, if self.reverse_pointers { methods.len() } else { 0 }),
            (0x06, methods.len()),
            (0x1B, typespecs as usize),
            (0x29, nested.len()),
        ];

        let mut data = Vec::new();
        push_u32(&mut data, 0);
        data.extend_from_slice(&[2, 0, 0, 1]);

        let valid = counts
            .iter()
            .filter(|(_, rows)| *rows > 0)
            .fold(0_u64, |valid, (table, _)| valid | (1 << table));
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&(1_u64 << 0x29).to_le_bytes());
        for (_, rows) in counts.iter().filter(|(_, rows)| *rows > 0) {
            push_u32(&mut data, u32::try_from(*rows).unwrap());
        }

        // Module
        push_u16(&mut data, 0);
        push_u16(&mut data, module_name);
        push_u16(&mut data, 1);
        push_u16(&mut data, 0);
        push_u16(&mut data, 0);

        // TypeRef, scoped to the module
        for (name, namespace) in &typerefs {
            push_u16(&mut data, 1 << 2);
            push_u16(&mut data, *name);
            push_u16(&mut data, *namespace);
        }

        for (flags, name, namespace, extends, field_list, method_list) in &typedefs {
            push_u32(&mut data, *flags);
            push_u16(&mut data, *name);
            push_u16(&mut data, *namespace);
            push_u16(&mut data, *extends);
            push_u16(&mut data, *field_list);
            push_u16(&mut data, *method_list);
        }

        if self.reverse_pointers {
            for rid in (1..=fields.len()).rev() {
                push_u16(&mut data, u16::try_from(rid).unwrap());
            }
        }

        for (flags, name) in &fields {
            push_u16(&mut data, *flags);
            push_u16(&mut data, *name);
            push_u16(&mut data, FIELD_SIGNATURE);
        }

        if self.reverse_pointers {
            for rid in (1..=methods.len()).rev() {
                push_u16(&mut data, u16::try_from(rid).unwrap());
            }
        }

        for (flags, name) in &methods {
            push_u32(&mut data, 0);
            push_u16(&mut data, 0);
            push_u16(&mut data, *flags);
            push_u16(&mut data, *name);
            push_u16(&mut data, METHOD_SIGNATURE);
            push_u16(&mut data, 1);
        }

        for _ in 0..typespecs {
            push_u16(&mut data, FIELD_SIGNATURE);
        }

        for (nested_class, enclosing_class) in &nested {
            push_u16(&mut data, *nested_class);
            push_u16(&mut data, *enclosing_class);
        }

        pad4(&mut data);
        data
    }

    fn metadata(&self) -> Vec<u8> {
        let mut strings = StringHeap::new();
        let tables = self.tables_stream(&mut strings);
        let mut strings = strings.data;
        pad4(&mut strings);
        let guid = vec![0x11_u8; 16];

        let tables_name: &[u8] = if self.uncompressed { b"#-\0\0" } else { b"#~\0\0" };
        let streams: [(&[u8], &[u8]); 4] = [
            (tables_name, &tables),
            (b"#Strings\0\0\0\0", &strings),
            (b"#Blob\0\0\0", &BLOB_HEAP),
            (b"#GUID\0\0\0", &guid),
        ];

        let headers_len: usize = streams.iter().map(|(name, _)| 8 + name.len()).sum();
        let mut offset = 16 + VERSION.len() + 4 + headers_len;

        let mut data = Vec::new();
        push_u32(&mut data, CIL_HEADER_MAGIC);
        push_u16(&mut data, 1);
        push_u16(&mut data, 1);
        push_u32(&mut data, 0);
        push_u32(&mut data, u32::try_from(VERSION.len()).unwrap());
        data.extend_from_slice(VERSION);
        push_u16(&mut data, 0);
        push_u16(&mut data, u16::try_from(streams.len()).unwrap());

        for (name, content) in &streams {
            push_u32(&mut data, u32::try_from(offset).unwrap());
            push_u32(&mut data, u32::try_from(content.len()).unwrap());
            data.extend_from_slice(name);
            offset += content.len();
        }

        for (_, content) in &streams {
            data.extend_from_slice(content);
        }

        data
    }

    pub fn build(self) -> Vec<u8> {
        let metadata = self.metadata();

        let mut section = vec![0_u8; METADATA_OFFSET];
        section.extend_from_slice(&metadata);
        let signature_offset = section.len();
        if self.strong_name_signed {
            section.extend_from_slice(&[0xAB; 0x80]);
        }
        let virtual_size = section.len();
        section.resize(virtual_size.div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT, 0);

        // CLR header
        let mut flags = COMIMAGE_FLAGS_ILONLY;
        if self.strong_name_signed {
            flags |= crate::metadata::cor20header::COMIMAGE_FLAGS_STRONGNAMESIGNED;
        }
        put_u32(&mut section, CLR_OFFSET, 72);
        put_u16(&mut section, CLR_OFFSET + 4, 2);
        put_u16(&mut section, CLR_OFFSET + 6, 5);
        put_u32(&mut section, CLR_OFFSET + 8, u32::try_from(SECTION_RVA + METADATA_OFFSET).unwrap());
        put_u32(&mut section, CLR_OFFSET + 12, u32::try_from(metadata.len()).unwrap());
        put_u32(&mut section, CLR_OFFSET + 16, flags);
        if self.strong_name_signed {
            put_u32(&mut section, CLR_OFFSET + 32, u32::try_from(SECTION_RVA + signature_offset).unwrap());
            put_u32(&mut section, CLR_OFFSET + 36, 0x80);
        }

        let mut image = vec![0_u8; FILE_ALIGNMENT];

        // DOS header
        image[0] = b'M';
        image[1] = b'Z';
        put_u32(&mut image, 0x3C, u32::try_from(PE_OFFSET).unwrap());

        // COFF header: i386, one section, PE32 optional header, executable DLL
        let mut offset = PE_OFFSET;
        image[offset..offset + 4].copy_from_slice(b"PE\0\0");
        offset += 4;
        put_u16(&mut image, offset, 0x014C);
        put_u16(&mut image, offset + 2, 1);
        put_u16(&mut image, offset + 16, 0xE0);
        put_u16(&mut image, offset + 18, 0x2102);
        offset += 20;

        // Optional header
        let optional = offset;
        let size_of_image = SECTION_RVA + virtual_size.div_ceil(0x2000) * 0x2000;
        put_u16(&mut image, optional, 0x010B);
        image[optional + 2] = 8;
        put_u32(&mut image, optional + 4, u32::try_from(section.len()).unwrap());
        put_u32(&mut image, optional + 20, u32::try_from(SECTION_RVA).unwrap());
        put_u32(&mut image, optional + 28, 0x0040_0000);
        put_u32(&mut image, optional + 32, 0x2000);
        put_u32(&mut image, optional + 36, u32::try_from(FILE_ALIGNMENT).unwrap());
        put_u16(&mut image, optional + 40, 4);
        put_u16(&mut image, optional + 48, 4);
        put_u32(&mut image, optional + 56, u32::try_from(size_of_image).unwrap());
        put_u32(&mut image, optional + 60, u32::try_from(FILE_ALIGNMENT).unwrap());
        put_u16(&mut image, optional + 68, 3);
        put_u16(&mut image, optional + 70, 0x8540);
        put_u32(&mut image, optional + 72, 0x0010_0000);
        put_u32(&mut image, optional + 76, 0x1000);
        put_u32(&mut image, optional + 80, 0x0010_0000);
        put_u32(&mut image, optional + 84, 0x1000);
        put_u32(&mut image, optional + 92, 16);

        // Data directory 14: CLR runtime header
        if self.with_clr {
            let clr_dir = optional + 96 + 14 * 8;
            put_u32(&mut image, clr_dir, u32::try_from(SECTION_RVA + CLR_OFFSET).unwrap());
            put_u32(&mut image, clr_dir + 4, 72);
        }

        // Section table
        let header = optional + 0xE0;
        image[header..header + 5].copy_from_slice(b".text");
        put_u32(&mut image, header + 8, u32::try_from(virtual_size).unwrap());
        put_u32(&mut image, header + 12, u32::try_from(SECTION_RVA).unwrap());
        put_u32(&mut image, header + 16, u32::try_from(section.len()).unwrap());
        put_u32(&mut image, header + 20, u32::try_from(FILE_ALIGNMENT).unwrap());
        put_u32(&mut image, header + 36, 0x6000_0020);

        image.extend_from_slice(&section);
        image
    }
}
