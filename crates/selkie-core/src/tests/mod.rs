mod api;
mod mutate;
