use bitflags::bitflags;

bitflags! {
    /// Access flags shared by classes, fields, and methods.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

/// Visibility level derived from access flags, ordered from least to most visible.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum AccessLevel {
    Private,
    PackageVisible,
    Protected,
    Public,
}

impl AccessFlags {
    pub fn level(self) -> AccessLevel {
        if self.contains(AccessFlags::PUBLIC) {
            AccessLevel::Public
        } else if self.contains(AccessFlags::PROTECTED) {
            AccessLevel::Protected
        } else if self.contains(AccessFlags::PRIVATE) {
            AccessLevel::Private
        } else {
            AccessLevel::PackageVisible
        }
    }

    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::PRIVATE)
    }

    pub fn is_final(self) -> bool {
        self.contains(AccessFlags::FINAL)
    }

    pub fn is_interface(self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }

    pub fn is_synthetic(self) -> bool {
        self.contains(AccessFlags::SYNTHETIC)
    }
}
