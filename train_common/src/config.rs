/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! RON based configuration loading. Config structs live in the crates that use them,
//! this only provides the common deserialization entry points

use std::fs;
use std::path::Path;
use serde::de::DeserializeOwned;

use crate::errors::{CommonError,Result};

/// load a RON config file into a Deserialize struct
pub fn load_config<C> (path: impl AsRef<Path>)->Result<C> where C: DeserializeOwned {
    let path = path.as_ref();
    let data = fs::read_to_string( path)
        .map_err(|e| CommonError::ConfigError( format!("failed to read config {}: {e}", path.display())))?;
    from_ron_str( &data)
}

/// parse a RON document into a Deserialize struct
pub fn from_ron_str<C> (data: &str)->Result<C> where C: DeserializeOwned {
    Ok( ron::from_str( data)? )
}
