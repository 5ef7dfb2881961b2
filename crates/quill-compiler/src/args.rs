//! Argument binding
//!
//! Synthesizes the parameter-matching step of a callable: required
//! positional slots, keyword slots with pre-evaluated defaults, and the
//! optional rest-positional / rest-keyword collectors. Invocation receives
//! the flattened representation described by the call protocol: a leading
//! positional run, keyword name/value pairs, and the two out-of-band
//! carriers for caller-side `*seq` / `**map` expansion.

use quill_core::{classes, collect_positional, throw, CallArgs, DictKey, Failure, Value};

/// The compile-time shape of one callable's parameters. Slot `i` of the
/// frame is required parameter `i`, then the keyword parameters, then the
/// rest-positional and rest-keyword collectors, in that order; body
/// locals follow.
#[derive(Debug, Clone)]
pub struct BindingSpec {
    pub function: String,
    pub required: Vec<String>,
    pub keywords: Vec<String>,
    pub rest_pos: Option<String>,
    pub rest_kw: Option<String>,
}

impl BindingSpec {
    /// Number of frame slots the parameters occupy.
    pub fn param_slots(&self) -> usize {
        self.required.len()
            + self.keywords.len()
            + self.rest_pos.is_some() as usize
            + self.rest_kw.is_some() as usize
    }
}

fn shape_error(msg: String) -> Failure {
    throw(&classes().type_error, msg)
}

/// Match a call's arguments against `spec` and bind the parameter slots
/// at the front of `locals`. `defaults` are the keyword defaults,
/// evaluated once at definition time, in keyword-parameter order.
pub fn bind(
    spec: &BindingSpec,
    defaults: &[Value],
    args: &CallArgs<'_>,
    locals: &mut [Value],
) -> Result<(), Failure> {
    let nreq = spec.required.len();
    let nslots = nreq + spec.keywords.len();

    let positional = collect_positional(args)?;

    // Assemble the full keyword run: explicit pairs first, then the
    // out-of-band excess-keyword mapping. The same name twice anywhere in
    // the run is a hard error.
    let mut keyword_run: Vec<(String, Value)> = args.keywords.to_vec();
    if let Some(star_map) = args.star_map {
        let Value::Dict(map) = star_map else {
            return Err(shape_error(format!(
                "{}() keyword expansion requires a dict, not {}",
                spec.function,
                star_map.type_name()
            )));
        };
        for (k, v) in map.borrow().iter() {
            let DictKey::Str(name) = k else {
                return Err(shape_error(format!(
                    "{}() keywords must be strings",
                    spec.function
                )));
            };
            keyword_run.push((name.to_string(), v.clone()));
        }
    }
    for (i, (name, _)) in keyword_run.iter().enumerate() {
        if keyword_run[..i].iter().any(|(n, _)| n == name) {
            return Err(shape_error(format!(
                "{}() got duplicate keyword argument '{}'",
                spec.function, name
            )));
        }
    }

    let mut slots: Vec<Option<Value>> = vec![None; nslots];
    let mut rest_positional: Vec<Value> = Vec::new();

    // Positional fill: left to right up to the total slot count, or up to
    // just the required count when a rest-positional parameter diverts
    // the remainder.
    let positional_limit = if spec.rest_pos.is_some() { nreq } else { nslots };
    for (i, value) in positional.into_iter().enumerate() {
        if i < positional_limit {
            slots[i] = Some(value);
        } else if spec.rest_pos.is_some() {
            rest_positional.push(value);
        } else {
            return Err(shape_error(format!(
                "{}() takes at most {} arguments",
                spec.function, nslots
            )));
        }
    }

    // Keyword matching against still-unfilled slots, by exact name.
    let mut rest_keywords: Vec<(String, Value)> = Vec::new();
    for (name, value) in keyword_run {
        let slot = spec
            .required
            .iter()
            .chain(spec.keywords.iter())
            .position(|p| p == &name);
        match slot {
            Some(i) => {
                if slots[i].is_some() {
                    return Err(shape_error(format!(
                        "{}() got multiple values for argument '{}'",
                        spec.function, name
                    )));
                }
                slots[i] = Some(value);
            }
            None if spec.rest_kw.is_some() => rest_keywords.push((name, value)),
            None => {
                return Err(shape_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    spec.function, name
                )));
            }
        }
    }

    // Unfilled required slots are errors; unfilled keyword slots take
    // their pre-evaluated default.
    for (i, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            if i < nreq {
                return Err(shape_error(format!(
                    "{}() missing required argument '{}'",
                    spec.function, spec.required[i]
                )));
            }
            *slot = Some(defaults[i - nreq].clone());
        }
    }

    for (i, slot) in slots.into_iter().enumerate() {
        locals[i] = slot.expect("every parameter slot filled");
    }
    let mut next = nslots;
    if spec.rest_pos.is_some() {
        locals[next] = Value::tuple(rest_positional);
        next += 1;
    }
    if spec.rest_kw.is_some() {
        let pairs = rest_keywords
            .into_iter()
            .map(|(k, v)| (Value::str(k), v))
            .collect();
        locals[next] = quill_core::object::make_dict(pairs)?;
    }
    Ok(())
}
