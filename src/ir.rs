use crate::access::AccessFlags;
use crate::attribute::Attribute;
use crate::constant::ConstantPool;
use crate::kotlin::KotlinMetadata;

/// Index of a class in the universe arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MemberKind {
    Field,
    Method,
}

/// Field or method address. `class` is the owning class.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemberId {
    pub class: ClassId,
    pub kind: MemberKind,
    pub index: u32,
}

impl MemberId {
    pub fn field(class: ClassId, index: usize) -> Self {
        Self {
            class,
            kind: MemberKind::Field,
            index: index as u32,
        }
    }

    pub fn method(class: ClassId, index: usize) -> Self {
        Self {
            class,
            kind: MemberKind::Method,
            index: index as u32,
        }
    }
}

/// Which pool a class belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PoolKind {
    Program,
    Library,
}

/// Class or interface with its symbolic data and derived links.
#[derive(Clone, Debug, PartialEq)]
pub struct Class {
    pub name: String,
    pub access: AccessFlags,
    pub super_name: Option<String>,
    pub interface_names: Vec<String>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub body: ClassBody,
    pub kotlin_metadata: Option<KotlinMetadata>,

    /// Set by the super-linker.
    pub super_class: Option<ClassId>,
    /// Parallel to `interface_names`.
    pub interface_classes: Vec<Option<ClassId>>,
    /// Set by the sub-linkers. Back references only.
    pub subclasses: Vec<ClassId>,
}

/// Variant specific data: program classes own a constant pool and attributes.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassBody {
    Program(ProgramBody),
    Library,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgramBody {
    pub constant_pool: ConstantPool,
    pub attributes: Vec<Attribute>,
}

impl Class {
    pub fn program(
        name: &str,
        access: AccessFlags,
        super_name: Option<&str>,
        interface_names: &[&str],
        constant_pool: ConstantPool,
    ) -> Self {
        Self::with_body(
            name,
            access,
            super_name,
            interface_names,
            ClassBody::Program(ProgramBody {
                constant_pool,
                attributes: Vec::new(),
            }),
        )
    }

    pub fn library(
        name: &str,
        access: AccessFlags,
        super_name: Option<&str>,
        interface_names: &[&str],
    ) -> Self {
        Self::with_body(
            name,
            access,
            super_name,
            interface_names,
            ClassBody::Library,
        )
    }

    fn with_body(
        name: &str,
        access: AccessFlags,
        super_name: Option<&str>,
        interface_names: &[&str],
        body: ClassBody,
    ) -> Self {
        Self {
            name: name.to_string(),
            access,
            super_name: super_name.map(str::to_string),
            interface_names: interface_names.iter().map(|name| name.to_string()).collect(),
            fields: Vec::new(),
            methods: Vec::new(),
            body,
            kotlin_metadata: None,
            super_class: None,
            interface_classes: Vec::new(),
            subclasses: Vec::new(),
        }
    }

    pub fn is_program(&self) -> bool {
        matches!(self.body, ClassBody::Program(_))
    }

    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    /// Program data of this class.
    ///
    /// # Panics
    /// Panics for library classes, which carry no constant pool or attributes.
    pub fn program_body(&self) -> &ProgramBody {
        match &self.body {
            ClassBody::Program(body) => body,
            ClassBody::Library => panic!("library class {} has no program body", self.name),
        }
    }

    /// Mutable program data of this class.
    ///
    /// # Panics
    /// Panics for library classes.
    pub fn program_body_mut(&mut self) -> &mut ProgramBody {
        match &mut self.body {
            ClassBody::Program(body) => body,
            ClassBody::Library => panic!("library class {} has no program body", self.name),
        }
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.program_body().constant_pool
    }

    /// Class level attributes; always empty for library classes.
    pub fn attributes(&self) -> &[Attribute] {
        match &self.body {
            ClassBody::Program(body) => &body.attributes,
            ClassBody::Library => &[],
        }
    }

    pub fn members(&self, kind: MemberKind) -> &[Member] {
        match kind {
            MemberKind::Field => &self.fields,
            MemberKind::Method => &self.methods,
        }
    }

    pub fn members_mut(&mut self, kind: MemberKind) -> &mut Vec<Member> {
        match kind {
            MemberKind::Field => &mut self.fields,
            MemberKind::Method => &mut self.methods,
        }
    }

    pub fn with_field(mut self, member: Member) -> Self {
        self.fields.push(member);
        self
    }

    pub fn with_method(mut self, member: Member) -> Self {
        self.methods.push(member);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.program_body_mut().attributes.push(attribute);
        self
    }

    pub fn with_kotlin_metadata(mut self, metadata: KotlinMetadata) -> Self {
        self.kotlin_metadata = Some(metadata);
        self
    }
}

/// Field or method owned by one class.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
    /// Always empty for members of library classes.
    pub attributes: Vec<Attribute>,
    /// Classes named by the descriptor, positionally; `None` when unresolved.
    pub referenced_classes: Vec<Option<ClassId>>,
}

impl Member {
    pub fn new(name: &str, descriptor: &str, access: AccessFlags) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            attributes: Vec::new(),
            referenced_classes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn is_initializer(&self) -> bool {
        self.name == crate::descriptor::METHOD_NAME_INIT
            || self.name == crate::descriptor::METHOD_NAME_CLINIT
    }
}
