// Shipment records: status classification, checklist inference, notes
// reconciliation, and the CRUD/list/dashboard API built on them.
// status, checklist and notes are pure and never fail; everything that
// touches Postgres lives in repository and handlers.

pub mod checklist;
pub mod dashboard;
pub mod filters;
pub mod form;
pub mod handlers;
pub mod notes;
pub mod repository;
pub mod status;
pub mod view;
