use crate::ir::{ClassId, MemberId};

/// Constant pool entry of a program class.
///
/// Symbolic indices point back into the same pool. The `referenced_*` slots are derived data
/// filled in by the reference initializer and cleared by `reference::clear_references`.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    /// Slot 0 and the second slot of long/double entries.
    Unusable,
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Utf8(String),
    String(StringConstant),
    Class(ClassConstant),
    FieldRef(RefConstant),
    MethodRef(RefConstant),
    InterfaceMethodRef(RefConstant),
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle(MethodHandleConstant),
    MethodType(MethodTypeConstant),
    Dynamic(DynamicConstant),
    InvokeDynamic(DynamicConstant),
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringConstant {
    pub string_index: u16,
    pub java_lang_string: Option<ClassId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassConstant {
    pub name_index: u16,
    /// Class named by the constant; element class for array types.
    pub referenced_class: Option<ClassId>,
    pub java_lang_class: Option<ClassId>,
}

/// Field, method, or interface method reference.
#[derive(Clone, Debug, PartialEq)]
pub struct RefConstant {
    pub class_index: u16,
    pub name_and_type_index: u16,
    /// Nominal owner class, `java/lang/Object` for array owners.
    pub referenced_class: Option<ClassId>,
    /// Resolved member; its `class` is the actual owner, which may be an ancestor.
    pub referenced_member: Option<MemberId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodHandleConstant {
    pub reference_kind: u8,
    pub reference_index: u16,
    pub java_lang_invoke_method_handle: Option<ClassId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodTypeConstant {
    pub descriptor_index: u16,
    pub referenced_classes: Vec<Option<ClassId>>,
    pub java_lang_invoke_method_type: Option<ClassId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DynamicConstant {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
    pub referenced_classes: Vec<Option<ClassId>>,
}

impl RefConstant {
    pub fn new(class_index: u16, name_and_type_index: u16) -> Self {
        Self {
            class_index,
            name_and_type_index,
            referenced_class: None,
            referenced_member: None,
        }
    }
}

/// Indexed constant pool; index 0 is never usable.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }

    pub fn from_entries(entries: Vec<Constant>) -> Self {
        if entries.is_empty() {
            return Self::new();
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut Constant> {
        self.entries.get_mut(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, constant)| (index as u16, constant))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut Constant)> {
        self.entries
            .iter_mut()
            .enumerate()
            .map(|(index, constant)| (index as u16, constant))
    }

    /// Appends a constant and returns its index. Long and double take two slots.
    pub fn push(&mut self, constant: Constant) -> u16 {
        let index = self.entries.len() as u16;
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        index
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Some(value),
            _ => None,
        }
    }

    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Class(class) => self.utf8(class.name_index),
            _ => None,
        }
    }

    pub fn string(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::String(string) => self.utf8(string.string_index),
            _ => None,
        }
    }

    /// Name and descriptor of a name-and-type entry.
    pub fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Some((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => None,
        }
    }

    /// Class name, member name, and descriptor of a field or method reference.
    pub fn ref_parts(&self, index: u16) -> Option<(&str, &str, &str)> {
        let reference = match self.get(index)? {
            Constant::FieldRef(reference)
            | Constant::MethodRef(reference)
            | Constant::InterfaceMethodRef(reference) => reference,
            _ => return None,
        };
        let class_name = self.class_name(reference.class_index)?;
        let (name, descriptor) = self.name_and_type(reference.name_and_type_index)?;
        Some((class_name, name, descriptor))
    }

    /// Descriptor of a dynamic or invoke-dynamic entry.
    pub fn dynamic_descriptor(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Dynamic(dynamic) | Constant::InvokeDynamic(dynamic) => self
                .name_and_type(dynamic.name_and_type_index)
                .map(|(_, descriptor)| descriptor),
            _ => None,
        }
    }

    pub fn add_utf8(&mut self, value: &str) -> u16 {
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::Utf8(existing) if existing == value => Some(index),
            _ => None,
        });
        existing.unwrap_or_else(|| self.push(Constant::Utf8(value.to_string())))
    }

    pub fn add_integer(&mut self, value: i32) -> u16 {
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::Integer(existing) if *existing == value => Some(index),
            _ => None,
        });
        existing.unwrap_or_else(|| self.push(Constant::Integer(value)))
    }

    pub fn add_string(&mut self, value: &str) -> u16 {
        let string_index = self.add_utf8(value);
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::String(string) if string.string_index == string_index => Some(index),
            _ => None,
        });
        existing.unwrap_or_else(|| {
            self.push(Constant::String(StringConstant {
                string_index,
                java_lang_string: None,
            }))
        })
    }

    pub fn add_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::Class(class) if class.name_index == name_index => Some(index),
            _ => None,
        });
        existing.unwrap_or_else(|| {
            self.push(Constant::Class(ClassConstant {
                name_index,
                referenced_class: None,
                java_lang_class: None,
            }))
        })
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        let existing = self.iter().find_map(|(index, constant)| match constant {
            Constant::NameAndType {
                name_index: n,
                descriptor_index: d,
            } if *n == name_index && *d == descriptor_index => Some(index),
            _ => None,
        });
        existing.unwrap_or_else(|| {
            self.push(Constant::NameAndType {
                name_index,
                descriptor_index,
            })
        })
    }

    pub fn add_field_ref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class_name);
        let name_and_type_index = self.add_name_and_type(name, descriptor);
        self.push(Constant::FieldRef(RefConstant::new(
            class_index,
            name_and_type_index,
        )))
    }

    pub fn add_method_ref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class_name);
        let name_and_type_index = self.add_name_and_type(name, descriptor);
        self.push(Constant::MethodRef(RefConstant::new(
            class_index,
            name_and_type_index,
        )))
    }

    pub fn add_interface_method_ref(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> u16 {
        let class_index = self.add_class(class_name);
        let name_and_type_index = self.add_name_and_type(name, descriptor);
        self.push(Constant::InterfaceMethodRef(RefConstant::new(
            class_index,
            name_and_type_index,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_reserves_second_slot_for_wide_constants() {
        let mut pool = ConstantPool::new();
        let long_index = pool.push(Constant::Long(7));
        let next = pool.push(Constant::Integer(1));
        assert_eq!(long_index, 1);
        assert_eq!(next, 3);
        assert_eq!(pool.get(2), Some(&Constant::Unusable));
    }

    #[test]
    fn add_helpers_intern_symbolic_entries() {
        let mut pool = ConstantPool::new();
        let first = pool.add_class("com/example/Foo");
        let second = pool.add_class("com/example/Foo");
        assert_eq!(first, second);

        let reference = pool.add_method_ref("com/example/Foo", "run", "()V");
        assert_eq!(
            pool.ref_parts(reference),
            Some(("com/example/Foo", "run", "()V"))
        );
        assert_eq!(pool.class_name(first), Some("com/example/Foo"));
        assert_eq!(pool.ref_parts(first), None);
    }
}
