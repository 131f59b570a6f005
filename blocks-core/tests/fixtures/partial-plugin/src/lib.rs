//! Plugin library that reports its API version but never registers anything

#[unsafe(no_mangle)]
pub extern "C" fn _blocks_plugin_api_version() -> u32 {
    blocks_plugin_api::API_VERSION
}
