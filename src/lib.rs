//! Colony Sim - deterministic tick-based colony simulation
//!
//! Pawns with decaying needs pick buildings through a utility scorer, walk
//! there on A* paths, and pay for or get paid by interactions in a closed gold
//! economy.

pub mod city;
pub mod command;
pub mod content;
pub mod core;
pub mod ecs;
pub mod entity;
pub mod persistence;
pub mod render;
pub mod simulation;
pub mod spatial;
pub mod world;
