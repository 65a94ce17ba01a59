pub mod fft;
pub mod poly;
