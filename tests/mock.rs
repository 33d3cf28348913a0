use std::sync::{Arc, Mutex, MutexGuard};

use mockall::*;
use pictoflow::image::ImageOps;

#[automock]
pub trait Spy {
	fn trigger(&self, value: i64);
}

#[derive(Clone)]
pub struct SharedMock(Arc<Mutex<MockSpy>>);

impl SharedMock {
	pub fn new() -> SharedMock {
		SharedMock(Arc::new(Mutex::new(MockSpy::new())))
	}

	pub fn get<'a>(&'a self) -> MutexGuard<'a, MockSpy> {
		return self.0.lock().unwrap();
	}
}

mock! {
	pub Ops {}

	impl ImageOps for Ops {
		type Image = u32;
		type Error = String;

		fn load(&self, id: u64) -> Result<u32, String>;
		fn invert(&self, image: &u32) -> Result<u32, String>;
		fn composite(&self, top: &u32, bottom: &u32) -> Result<u32, String>;
		fn brightness_contrast(&self, image: &u32, brightness: f64, contrast: f64) -> Result<u32, String>;
		fn gaussian_blur(&self, image: &u32, std_dev_x: f64, std_dev_y: f64) -> Result<u32, String>;
		fn solid_color(&self, color: &str) -> Result<u32, String>;
	}
}
