//! End-to-end tests over an in-memory transport. No network access.

mod access_layer;
mod mock_transport;
mod surfaces;
