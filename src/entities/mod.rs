//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod acta;
pub mod acta_item;
pub mod analyst;
pub mod consumable;
pub mod device;
pub mod furniture;
pub mod movement;
pub mod signature_token;
pub mod user;

// Re-export specific types to avoid conflicts
pub use acta::{Column as ActaColumn, Entity as Acta, Model as ActaModel};
pub use acta_item::{Column as ActaItemColumn, Entity as ActaItem, Model as ActaItemModel};
pub use analyst::{Column as AnalystColumn, Entity as Analyst, Model as AnalystModel};
pub use consumable::{Column as ConsumableColumn, Entity as Consumable, Model as ConsumableModel};
pub use device::{Column as DeviceColumn, Entity as Device, Model as DeviceModel};
pub use furniture::{Column as FurnitureColumn, Entity as Furniture, Model as FurnitureModel};
pub use movement::{Column as MovementColumn, Entity as Movement, Model as MovementModel};
pub use signature_token::{
    Column as SignatureTokenColumn, Entity as SignatureToken, Model as SignatureTokenModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
