//! Bundled policy plugins
//!
//! The engine runs without any of these; they are the standard policy set a
//! deployment registers next to the built-in ROUTE and EXECUTE plugins.

mod private {}

#[ cfg( feature = "policy-plugins" ) ]
crate::mod_interface!
{
  layer sampling_policy;
  layer safety;
  layer quota_gate;
  layer memory_injection;
  layer output_parser;
}

#[ cfg( not( feature = "policy-plugins" ) ) ]
crate::mod_interface!
{
  // Empty when policy-plugins feature is disabled
}
