use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::api::CloudError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Matrix4,
    Color,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Scalar => "float",
            ParamKind::Int => "int",
            ParamKind::Bool => "bool",
            ParamKind::Vec2 => "vec2",
            ParamKind::Vec3 => "vec3",
            ParamKind::Vec4 => "vec4",
            ParamKind::Matrix4 => "mat4",
            ParamKind::Color => "color",
        }
    }
}

/// Named-parameter interface of a bound program.
///
/// Every setter fails when the program does not declare `name`; a program only
/// overrides the setters for the kinds it actually uses.
pub trait ParameterSink {
    fn program(&self) -> &'static str;

    /// Parameters the program declares, with their kinds.
    fn declared(&self) -> &'static [(&'static str, ParamKind)];

    /// Error for a push the program did not accept.
    fn reject(&self, name: &str, pushed: ParamKind) -> CloudError {
        match self.declared().iter().find(|(declared, _)| *declared == name) {
            Some((_, kind)) if *kind != pushed => CloudError::ParameterType {
                program: self.program(),
                name: name.to_string(),
                expected: kind.as_str(),
            },
            _ => CloudError::MissingParameter { program: self.program(), name: name.to_string() },
        }
    }

    fn set_scalar(&mut self, name: &str, _value: f32) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Scalar))
    }

    fn set_int(&mut self, name: &str, _value: i32) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Int))
    }

    fn set_bool(&mut self, name: &str, _value: bool) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Bool))
    }

    fn set_vec2(&mut self, name: &str, _value: Vec2) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Vec2))
    }

    fn set_vec3(&mut self, name: &str, _value: Vec3) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Vec3))
    }

    fn set_vec4(&mut self, name: &str, _value: Vec4) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Vec4))
    }

    fn set_matrix4(&mut self, name: &str, _value: Mat4) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Matrix4))
    }

    /// Linear RGBA.
    fn set_color(&mut self, name: &str, _value: Vec4) -> Result<(), CloudError> {
        Err(self.reject(name, ParamKind::Color))
    }
}
