use eframe::egui::ColorImage;

/// Fetches and decodes the thumbnail the engine reported for a resource.
/// Purely cosmetic, so any error just yields no preview.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    // Blocking HTTP GET; callers run this on a blocking task
    let resp = reqwest::blocking::get(url).ok()?.bytes().ok()?;
    let img = image::load_from_memory(&resp).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
