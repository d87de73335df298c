pub mod routes;
pub mod socket;
