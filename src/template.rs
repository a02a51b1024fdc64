use std::{collections::BTreeMap, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{asset::DockerImageAsset, stack::StackEntry};

const FORMAT_VERSION: &str = "2010-09-09";
const POLICY_VERSION: &str = "2012-10-17";
const BASIC_EXECUTION_POLICY: &str =
    "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Template for one stack, in the format the provisioning engine deploys.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    resources: BTreeMap<String, Resource>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Resource {
    #[serde(rename = "Type")]
    kind: &'static str,
    properties: Properties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Properties {
    Role(RoleProperties),
    Function(FunctionProperties),
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RoleProperties {
    assume_role_policy_document: PolicyDocument,
    managed_policy_arns: Vec<Sub>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument {
    statement: Vec<Statement>,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Statement {
    action: &'static str,
    effect: &'static str,
    principal: Principal,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Principal {
    service: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionProperties {
    code: Code,
    environment: Environment,
    function_name: String,
    memory_size: u32,
    package_type: &'static str,
    role: GetAtt,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    timeout: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Code {
    image_uri: Sub,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Environment {
    variables: BTreeMap<String, String>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct Sub {
    #[serde(rename = "Fn::Sub")]
    sub: String,
}

#[derive(Serialize)]
struct GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    get_att: [String; 2],
}

impl Template {
    /// Render the function of a registered stack together with its execution role.
    pub fn render(entry: &StackEntry, asset: &DockerImageAsset) -> Self {
        let descriptor = &entry.descriptor;
        let role_id = format!("{}ServiceRole", descriptor.name());
        let tags = entry
            .props
            .tags
            .iter()
            .map(|(key, value)| Tag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect::<Vec<_>>();

        let role = Resource {
            kind: "AWS::IAM::Role",
            properties: Properties::Role(RoleProperties {
                assume_role_policy_document: PolicyDocument {
                    statement: vec![Statement {
                        action: "sts:AssumeRole",
                        effect: "Allow",
                        principal: Principal {
                            service: "lambda.amazonaws.com",
                        },
                    }],
                    version: POLICY_VERSION,
                },
                managed_policy_arns: vec![Sub {
                    sub: BASIC_EXECUTION_POLICY.into(),
                }],
                tags: tags.clone(),
            }),
            depends_on: vec![],
        };

        let function = Resource {
            kind: "AWS::Lambda::Function",
            properties: Properties::Function(FunctionProperties {
                code: Code {
                    image_uri: Sub {
                        sub: asset.image_uri(),
                    },
                },
                environment: Environment {
                    variables: descriptor.environment().clone(),
                },
                function_name: descriptor.name().into(),
                memory_size: descriptor.memory_mb(),
                package_type: "Image",
                role: GetAtt {
                    get_att: [role_id.clone(), "Arn".into()],
                },
                tags,
                timeout: descriptor.timeout_seconds(),
            }),
            depends_on: vec![role_id.clone()],
        };

        let resources = BTreeMap::from([(role_id, role), (descriptor.name().into(), function)]);

        Self {
            format_version: FORMAT_VERSION,
            description: entry.props.description.clone(),
            resources,
        }
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to open {:?}", path.as_ref()))?;
        serde_json::to_writer_pretty(&mut file, self).context("Failed to serialize template")?;
        file.write_all(b"\n")?;
        Ok(())
    }
}
