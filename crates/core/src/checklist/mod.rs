//! Vehicle checklist domain: value objects, entities, the `Checklist`
//! aggregate, its rules, ports and the application service.

pub mod aggregate;
pub mod api;
pub mod context;
pub mod domain_service;
pub mod evidence;
pub mod item;
pub mod memory;
pub mod ports;
pub mod service;
pub mod value_objects;
