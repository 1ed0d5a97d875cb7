//! Import data structures: vertices, textures, meshes, models and scene graphs.
//!
//! - `vertex` is the fixed GPU vertex layout
//! - `texture` contains texture records, decoded images and slot naming
//! - `mesh` holds one uploaded mesh and its draw contract
//! - `model` aggregates meshes and the texture cache of one import
//! - `scene_graph` is the parsed scene handed over by a scene parser

pub mod mesh;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod vertex;
