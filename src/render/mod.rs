pub(crate) mod backend;
pub(crate) mod cpu;
pub(crate) mod program;
pub(crate) mod raster;
pub(crate) mod surface_pool;
