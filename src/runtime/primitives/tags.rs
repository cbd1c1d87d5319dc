use crate::runtime::{error::ExecResult, interpreter::ExecutionContext, value::Value};

use super::helpers::{mutate_self, name_arg};

pub async fn add(ctx: &ExecutionContext, tag: &Value) -> ExecResult<()> {
    let Some(tag) = name_arg("addTag", tag) else {
        return Ok(());
    };
    mutate_self(ctx, move |object| {
        let mut tags = object.tags();
        if !tags.contains(&tag) {
            tags.push(tag.clone());
            object.set_tags(tags);
        }
    })
    .await
}

pub async fn remove(ctx: &ExecutionContext, tag: &Value) -> ExecResult<()> {
    let Some(tag) = name_arg("removeTag", tag) else {
        return Ok(());
    };
    mutate_self(ctx, move |object| {
        let mut tags = object.tags();
        let before = tags.len();
        tags.retain(|t| *t != tag);
        if tags.len() != before {
            object.set_tags(tags);
        }
    })
    .await
}
