mod fetch_runner;
mod sampler_properties;
