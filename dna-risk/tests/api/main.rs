mod encoding;
mod helpers;
mod service;
mod training;
