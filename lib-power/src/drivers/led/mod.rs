pub mod pca9633;
