mod coercion;
mod normalization;
