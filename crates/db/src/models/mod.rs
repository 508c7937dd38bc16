pub mod checklist;
pub mod timeline;
pub mod vehicle;
