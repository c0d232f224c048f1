// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

pub mod decorators;
pub mod object_graph;
pub mod registry;

pub use decorators::{Annotations, Decorator};
pub use object_graph::ObjectGraph;
pub use registry::AnnotationRegistry;
