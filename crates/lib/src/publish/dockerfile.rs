//! Dockerfile generation for application packages.
//!
//! The package root is the build context; its `app/` folder is copied to
//! `${APPHOME}` (`/app`), the directory `{r}` container paths resolve against.

use std::fmt::Write;

use crate::consts::CONTAINER_APP_ROOT;
use crate::spec::ApplicationSpec;

const BASE_IMAGE: &str = "ubuntu:14.04";

/// Render the Dockerfile of an application package.
pub fn render(spec: &ApplicationSpec) -> String {
  let mut out = String::new();
  line(&mut out, &format!("FROM {}", BASE_IMAGE));
  line(&mut out, &format!("LABEL maintainer=\"{}\"", spec.app_info.publisher));

  line(&mut out, "\n#Application Package Environment Variables");
  line(&mut out, &format!("ENV APPHOME {}", CONTAINER_APP_ROOT));
  line(&mut out, "ENV DEPHOME /dep");
  line(&mut out, "ENV SCHEMAS /schemas");
  line(&mut out, "ENV TESTRUNS /testruns");
  line(&mut out, "ENV INPUT /input");

  line(&mut out, "\n#Copy application files");
  line(&mut out, "COPY app ${APPHOME}");
  line(&mut out, "WORKDIR ${APPHOME}");
  line(&mut out, "RUN chmod -R a+x *");

  for dep in &spec.dependencies.env_deps {
    line(&mut out, &format!("#EnvDep: {}", dep.name));
    line(&mut out, &format!("ENV {} {}", dep.name, dep.value));
  }

  line(&mut out, "\n#Software dependencies");
  for dep in &spec.dependencies.soft_deps {
    line(&mut out, &format!("#SoftDep: {}", dep.name));
    if !dep.commands.is_empty() {
      line(&mut out, &format!("RUN {}", dep.commands.join(";")));
    }
  }

  line(&mut out, "\n#Set workdir and default cmd");
  line(&mut out, "WORKDIR ${APPHOME}");
  line(&mut out, "CMD [\"/sbin/init\"]");
  out
}

fn line(out: &mut String, text: &str) {
  // Writing to a String cannot fail.
  let _ = writeln!(out, "{}", text);
}

/// Image tag of an application: `<prefix><name>:<version>`, lowercased.
///
/// Whitespace is dropped and any other character outside `[a-z0-9._-]` becomes `-`.
pub fn image_tag(prefix: &str, name: &str, version: &str) -> String {
  let name = tag_component(name, "app");
  let version = tag_component(version, "latest");
  format!("{}{}:{}", prefix, name, version)
}

fn tag_component(raw: &str, fallback: &str) -> String {
  let cleaned: String = raw
    .chars()
    .filter(|c| !c.is_whitespace())
    .map(|c| c.to_ascii_lowercase())
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
        c
      } else {
        '-'
      }
    })
    .collect();
  let cleaned = cleaned.trim_start_matches(['.', '-']);
  if cleaned.is_empty() {
    fallback.to_string()
  } else {
    cleaned.to_string()
  }
}
