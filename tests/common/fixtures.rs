use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_FIXTURE: AtomicUsize = AtomicUsize::new(0);

/// A scratch directory for one test, removed again on drop.
pub struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "model-forge-{}-{}-{}",
            name,
            std::process::id(),
            NEXT_FIXTURE.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).expect("failed to create fixture directory");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> String {
        self.dir.join(file).to_string_lossy().into_owned()
    }

    pub fn write(&self, file: &str, contents: &str) -> String {
        let path = self.dir.join(file);
        fs::write(&path, contents).expect("failed to write fixture file");
        path.to_string_lossy().into_owned()
    }

    pub fn write_bytes(&self, file: &str, contents: &[u8]) -> String {
        let path = self.dir.join(file);
        fs::write(&path, contents).expect("failed to write fixture file");
        path.to_string_lossy().into_owned()
    }

    /// Write a `width` x `height` PNG with the given number of channels.
    pub fn png(&self, file: &str, channels: u8, width: u32, height: u32) {
        let path = self.dir.join(file);
        let result = match channels {
            1 => image::GrayImage::from_pixel(width, height, image::Luma([128])).save(&path),
            2 => image::GrayAlphaImage::from_pixel(width, height, image::LumaA([128, 255]))
                .save(&path),
            3 => image::RgbImage::from_pixel(width, height, image::Rgb([200, 100, 50])).save(&path),
            4 => image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]))
                .save(&path),
            other => panic!("no fixture image with {other} channels"),
        };
        result.expect("failed to write fixture image");
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// Corners, texture coordinates and the normal of a unit quad.
pub const QUAD_VERTICES: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
";

/// The two triangles of the quad in [`QUAD_VERTICES`].
pub const QUAD_FACES: &str = "\
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

/// A single triangle with positions only.
pub const BARE_TRIANGLE: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";
