//! Optical character recognition for uploaded images.

pub mod tesseract;

pub use tesseract::{OcrOutput, TesseractOcr};
