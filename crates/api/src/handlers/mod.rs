pub mod checklists;
pub mod migration;
