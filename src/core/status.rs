//! Enumerated values stored as strings in the database.
//!
//! Entities keep these columns as `String`; every write goes through the
//! enums below so only known values reach the tables.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Database / wire representation
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(Error::validation(format!(
                        concat!("Unknown ", $label, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Back-office role
    Role, "role" {
        /// Manages users and everything else
        Admin => "admin",
        /// Day-to-day inventory operator
        Operador => "operador",
    }
}

string_enum! {
    /// Lifecycle state of a device
    DeviceStatus, "device status" {
        /// In storage, can be handed out
        Disponible => "disponible",
        /// Held by an analyst
        Asignado => "asignado",
        /// Under repair, cannot be handed out
        Mantenimiento => "mantenimiento",
        /// Retired
        Baja => "baja",
    }
}

string_enum! {
    /// Asset class an acta or movement refers to
    AssetClass, "asset class" {
        /// Serialised device
        Dispositivo => "dispositivo",
        /// Consumable stock
        Consumible => "consumible",
        /// Furniture stock
        Mueble => "mueble",
    }
}

string_enum! {
    /// Direction of an acta
    ActaKind, "acta type" {
        /// Hand-off to the analyst
        Entrega => "entrega",
        /// Return from the analyst
        Devolucion => "devolucion",
    }
}

string_enum! {
    /// Signature state of an acta
    ActaStatus, "acta status" {
        /// Waiting for the analyst's signature
        PendienteFirma => "pendiente_firma",
        /// Signed; inventory effects applied
        Firmada => "firmada",
        /// Rejected; no inventory effects
        Rechazada => "rechazada",
    }
}

string_enum! {
    /// Kind of inventory movement
    MovementKind, "movement type" {
        /// Item registered
        Alta => "alta",
        /// Stock added
        Entrada => "entrada",
        /// Stock removed
        Salida => "salida",
        /// Device assigned to an analyst
        Asignacion => "asignacion",
        /// Item returned by an analyst
        Devolucion => "devolucion",
        /// Item retired
        Baja => "baja",
        /// Manual correction (state change without stock change)
        Ajuste => "ajuste",
    }
}
