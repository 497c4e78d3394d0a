/// Fixed RGB rule used as a cheap face-presence proxy.
///
/// Accepts a wide band of skin tones while rejecting grey, saturated and
/// blown-out pixels.
pub fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    r > 60
        && g > 40
        && b > 20
        && r > g
        && r > b
        && (r - g).abs() > 10
        && r - b > 10
        && r < 250
        && g < 230
        && b < 210
}
