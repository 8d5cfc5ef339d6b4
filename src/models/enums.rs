use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum DatabaseType {
    MsSQL,
    PostgreSQL,
    MySQL,
    SQLite,
    Oracle,
}

impl DatabaseType {
    /// Parse a loose backend name as found in config files and env vars.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" | "tsql" => Some(DatabaseType::MsSQL),
            "postgres" | "postgresql" | "pg" => Some(DatabaseType::PostgreSQL),
            "mysql" | "mariadb" => Some(DatabaseType::MySQL),
            "sqlite" | "sqlite3" => Some(DatabaseType::SQLite),
            "oracle" => Some(DatabaseType::Oracle),
            _ => None,
        }
    }
}

/// Declared type of a column or literal, independent of any backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug, Default)]
pub enum LogicalType {
    #[default]
    Unknown,
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Single,
    Double,
    String,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    Guid,
    Binary,
}

impl LogicalType {
    /// Literals of these types are emitted inside string delimiters.
    pub fn is_quoted(&self) -> bool {
        matches!(
            self,
            LogicalType::String
                | LogicalType::Date
                | LogicalType::Time
                | LogicalType::DateTime
                | LogicalType::DateTimeOffset
                | LogicalType::Guid
        )
    }
}

/// Provider parameter type. The superset of the native parameter enums of
/// the supported backends; each dialect maps its native type names onto it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum ProviderType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Money,
    Real,
    Float,
    Char,
    NChar,
    VarChar,
    NVarChar,
    Text,
    NText,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Timestamp,
    TimestampTz,
    Uuid,
    Binary,
    VarBinary,
    Json,
    Xml,
    Variant,
}

impl ProviderType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ProviderType::Decimal | ProviderType::Money)
    }

    pub fn is_character(&self) -> bool {
        matches!(
            self,
            ProviderType::Char
                | ProviderType::NChar
                | ProviderType::VarChar
                | ProviderType::NVarChar
                | ProviderType::Binary
                | ProviderType::VarBinary
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ProviderType::Time
                | ProviderType::DateTime
                | ProviderType::DateTime2
                | ProviderType::DateTimeOffset
                | ProviderType::Timestamp
                | ProviderType::TimestampTz
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}
