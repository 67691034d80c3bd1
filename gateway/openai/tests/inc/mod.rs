use super::*;

mod wire_mapping_test;
mod provider_surface_test;
