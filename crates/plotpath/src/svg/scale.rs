/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Largest `(width, height)` with the source aspect ratio that fits in the
/// `max_w` x `max_h` box. A degenerate source fills the box.
pub fn compute_fit_scale(src_w: f64, src_h: f64, max_w: f64, max_h: f64) -> (f64, f64) {
    if src_w <= 0.0 || src_h <= 0.0 {
        return (max_w, max_h);
    }
    let scale = (max_w / src_w).min(max_h / src_h);
    (src_w * scale, src_h * scale)
}

/// Dots per inch that map `src_width` pixels onto `fitted_width` mm.
pub fn resolution_for(src_width: f64, fitted_width: f64) -> f64 {
    src_width / fitted_width * MM_PER_INCH
}

/// Fixed-point rendering handed to the toolpath generator.
pub fn format_resolution(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}
