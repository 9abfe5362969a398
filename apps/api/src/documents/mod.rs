// Shipment attachments: metadata rows in Postgres, bodies in object storage.

pub mod handlers;
pub mod storage;
