pub trait FixedKeys {
    const STORE_VERSION_KEY: &'static [u8] = "store_version".as_bytes();
}
