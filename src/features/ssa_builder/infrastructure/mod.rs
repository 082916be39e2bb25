mod braun_ssa_builder;

pub use braun_ssa_builder::build_ssa;
