// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Registries for characterized objects and named models.
//!
//! A [`Model`] is a characterized object promoted to a named reference
//! shape; models can be written to and loaded from JSON files. The
//! [`ModelManager`] owns both registries and hands out automatic object
//! names (`obj0`, `obj1`, ...) when the operator does not provide one.

use crate::object::CharacterizedObject;
use crate::scanner::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, warn};

/// A named reference shape for anomaly detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Model {
    name: String,
    object: CharacterizedObject,
}

impl Model {
    pub fn new(name: impl Into<String>, object: CharacterizedObject) -> Self {
        Self {
            name: name.into(),
            object,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> &CharacterizedObject {
        &self.object
    }

    /// Write the model to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        let model = serde_json::from_reader(BufReader::new(file))?;
        Ok(model)
    }
}

/// Object and model registries.
#[derive(Debug, Default)]
pub struct ModelManager {
    objects: BTreeMap<String, CharacterizedObject>,
    models: BTreeMap<String, Model>,
    next_id: u32,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager with models preloaded from files. Unreadable
    /// files are skipped with a warning.
    pub fn with_models(paths: &[impl AsRef<Path>]) -> Self {
        let mut manager = Self::new();
        for path in paths {
            let path = path.as_ref();
            match Model::load(path) {
                Ok(model) => {
                    debug!("preloaded model {} from {}", model.name(), path.display());
                    manager.models.insert(model.name().to_string(), model);
                }
                Err(e) => warn!("could not preload model {}: {}", path.display(), e),
            }
        }
        manager
    }

    /// Register a characterized object. With `name` unset an automatic
    /// `objN` name is assigned. Returns the registered name, or `None` if
    /// the name is already taken.
    pub fn new_object(
        &mut self,
        name: Option<String>,
        object: CharacterizedObject,
    ) -> Option<String> {
        let name = match name {
            Some(name) => name,
            None => loop {
                let candidate = format!("obj{}", self.next_id);
                self.next_id += 1;
                if !self.objects.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        if self.objects.contains_key(&name) {
            return None;
        }
        self.objects.insert(name.clone(), object);
        Some(name)
    }

    /// Promote an object to a model under a new name. Fails when the
    /// object does not exist or the model name is taken.
    pub fn new_model(&mut self, object_name: &str, model_name: &str) -> bool {
        if self.models.contains_key(model_name) {
            return false;
        }
        match self.objects.get(object_name) {
            Some(object) => {
                self.models.insert(
                    model_name.to_string(),
                    Model::new(model_name, object.clone()),
                );
                true
            }
            None => false,
        }
    }

    /// Load a model file and register it under the given name.
    pub fn load_model(&mut self, path: &Path, name: &str) -> Result<(), Error> {
        if self.models.contains_key(name) {
            return Err(Error::Config(format!("model {name} already exists")));
        }
        let model = Model::load(path)?;
        self.models
            .insert(name.to_string(), Model::new(name, model.object().clone()));
        Ok(())
    }

    /// Write a registered model to a file.
    pub fn write_model(&self, name: &str, path: &Path) -> Result<(), Error> {
        match self.models.get(name) {
            Some(model) => model.write(path),
            None => Err(Error::Config(format!("model {name} does not exist"))),
        }
    }

    pub fn object(&self, name: &str) -> Option<&CharacterizedObject> {
        self.objects.get(name)
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered object names, sorted.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Registered model names, sorted.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
