//! Closed vocabularies shared by the store, the pricing engine and the dialog.
//!
//! Every enum here has a lowercase ASCII text form. That form is what lands in
//! text columns, in serialized dialog payloads and inside callback tags, so it
//! must never contain whitespace or colons.

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored text form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Physical usage area of the salon.
    pub enum Place {
        /// Shared hall, rented by the hour.
        Hall => "hall",
        /// Private cabinet, rented by the day.
        Cabinet => "cabinet",
    }
}

text_enum! {
    /// Rent time granularity.
    pub enum RentUnit {
        Hour => "hour",
        Day => "day",
    }
}

text_enum! {
    /// Staff role. Only an explicit promotion produces `SuperAdmin`.
    pub enum Role {
        Master => "master",
        SalonAdmin => "salon_admin",
        SuperAdmin => "super_admin",
    }
}

text_enum! {
    /// Registration status.
    pub enum UserStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    /// What a warehouse holds.
    pub enum WarehouseKind {
        /// Materials masters consume during rent sessions.
        Consumables => "consumables",
        /// Goods used for client service.
        ClientService => "client_service",
    }
}

text_enum! {
    /// Unit a material is counted in.
    pub enum MaterialUnit {
        Pcs => "pcs",
        Gram => "g",
        Milliliter => "ml",
        Liter => "l",
        Kilogram => "kg",
    }
}

text_enum! {
    /// Direction of a stock movement.
    pub enum MovementKind {
        In => "in",
        Out => "out",
    }
}

text_enum! {
    pub enum SessionStatus {
        Draft => "draft",
        Confirmed => "confirmed",
    }
}

text_enum! {
    pub enum InvoiceStatus {
        Pending => "pending",
        Paid => "paid",
    }
}

impl Place {
    /// The rent unit this place is billed in.
    pub fn unit(&self) -> RentUnit {
        match self {
            Place::Hall => RentUnit::Hour,
            Place::Cabinet => RentUnit::Day,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Place::Hall => "Hall",
            Place::Cabinet => "Cabinet",
        }
    }
}

impl RentUnit {
    /// Short label used after quantities ("12 h").
    pub fn label(&self) -> &'static str {
        match self {
            RentUnit::Hour => "h",
            RentUnit::Day => "d",
        }
    }
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Master => "Master",
            Role::SalonAdmin => "Salon admin",
            Role::SuperAdmin => "Super admin",
        }
    }

    /// Whether this role may manage stock, supplies and the catalog.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SalonAdmin | Role::SuperAdmin)
    }
}

impl WarehouseKind {
    pub fn label(&self) -> &'static str {
        match self {
            WarehouseKind::Consumables => "Consumables",
            WarehouseKind::ClientService => "Client service",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_forms_are_tag_safe() {
        let forms = Place::ALL
            .iter()
            .map(Place::as_str)
            .chain(RentUnit::ALL.iter().map(RentUnit::as_str))
            .chain(Role::ALL.iter().map(Role::as_str))
            .chain(WarehouseKind::ALL.iter().map(WarehouseKind::as_str))
            .chain(MaterialUnit::ALL.iter().map(MaterialUnit::as_str));

        for form in forms {
            assert!(!form.contains(':'), "{form}");
            assert!(!form.contains(char::is_whitespace), "{form}");
            assert_eq!(form, form.to_ascii_lowercase());
        }
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "sauna".parse::<Place>().unwrap_err();
        assert_eq!(err.to_string(), "unknown Place: sauna");
    }

    #[test]
    fn test_serde_uses_text_form() {
        let json = serde_json::to_string(&MaterialUnit::Gram).unwrap();
        assert_eq!(json, "\"g\"");
        let role: Role = serde_json::from_str("\"salon_admin\"").unwrap();
        assert_eq!(role, Role::SalonAdmin);
    }

    #[test]
    fn test_place_unit_pairing() {
        assert_eq!(Place::Hall.unit(), RentUnit::Hour);
        assert_eq!(Place::Cabinet.unit(), RentUnit::Day);
    }
}
