// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod backend;
pub mod cache;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod ids;
pub mod model;
pub mod selection;
pub mod validation;

pub use backend::*;
pub use cache::*;
pub use dashboard::*;
pub use error::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use selection::*;
pub use validation::*;
