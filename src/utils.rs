/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b * b + a
    } else {
        a * a + a + b
    }
}

/// Pairing function for two `u64` values.
///
/// Injective, and free of overflow as long as both arguments fit in 32 bits.
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}
