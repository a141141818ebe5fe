// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod model;
pub mod projection;
pub mod repository;
pub mod store;

pub use controller::*;
pub use model::*;
pub use projection::*;
pub use repository::*;
pub use store::*;
