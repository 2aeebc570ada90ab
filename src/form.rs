//! Form fields and their validation flags.

use serde::{Deserialize, Serialize};

use crate::catalog::{ChipType, ShippingMethod};
use crate::fields;

/// Free-text fields of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Cpf,
    Birth,
    Name,
    Email,
    Cell,
    Cep,
    District,
    City,
    State,
    Street,
    Number,
    Complement,
    Coupon,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Birth => "birth",
            Self::Name => "name",
            Self::Email => "email",
            Self::Cell => "cell",
            Self::Cep => "cep",
            Self::District => "district",
            Self::City => "city",
            Self::State => "state",
            Self::Street => "street",
            Self::Number => "number",
            Self::Complement => "complement",
            Self::Coupon => "coupon",
        }
    }

    /// Apply the field's input mask, if it has one.
    pub fn mask(&self, value: &str) -> String {
        match self {
            Self::Cpf => fields::format_cpf(value),
            Self::Cell => fields::format_phone(value),
            Self::Cep => fields::format_cep(value),
            Self::Birth => fields::format_birth(value),
            _ => value.to_string(),
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the visitor has entered or selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    pub cpf: String,
    pub birth: String,
    pub name: String,
    pub email: String,
    pub cell: String,
    pub cep: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub coupon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chip_type: Option<ChipType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingMethod>,
}

impl FormData {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Cpf => &self.cpf,
            Field::Birth => &self.birth,
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Cell => &self.cell,
            Field::Cep => &self.cep,
            Field::District => &self.district,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::Street => &self.street,
            Field::Number => &self.number,
            Field::Complement => &self.complement,
            Field::Coupon => &self.coupon,
        }
    }

    /// Store a value as-is (no masking).
    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Cpf => &mut self.cpf,
            Field::Birth => &mut self.birth,
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Cell => &mut self.cell,
            Field::Cep => &mut self.cep,
            Field::District => &mut self.district,
            Field::City => &mut self.city,
            Field::State => &mut self.state,
            Field::Street => &mut self.street,
            Field::Number => &mut self.number,
            Field::Complement => &mut self.complement,
            Field::Coupon => &mut self.coupon,
        };
        *slot = value;
    }
}

/// Three-state result of an advisory check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// WhatsApp check state; `Checking` while the lookup is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneCheck {
    #[default]
    Unknown,
    Checking,
    Valid,
    Invalid,
}

/// Validity flags derived from typing and from validator responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    /// CPF and birth date matched an identity record; name is locked.
    pub tax_id_verified: bool,
    pub email_verified: bool,
    pub postal_code: Check,
    pub birth_date: Check,
    pub phone: PhoneCheck,
    pub coupon: Check,
}
