mod indexed_addressing;
mod label_resolution;
mod org_regions;
mod properties;
