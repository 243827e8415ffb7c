//! Terraform configuration for the WordPress stack on EKS.
//!
//! Node group sizing follows the cluster's `nodes` figure. Database resources
//! are infrastructure and do not scale with workload replicas.

use stackdeck_core::ServiceRecord;

use crate::hcl::{Block, Document, Expr};
use crate::{header_timestamp, replicas_of, RenderInput};

const NODE_GROUP_MAX: u32 = 10;

fn providers() -> Block {
    let provider = |source: &str, version: &str| {
        Expr::Object(vec![
            ("source".to_string(), source.into()),
            ("version".to_string(), version.into()),
        ])
    };
    Block::new("terraform", &[]).block(
        Block::new("required_providers", &[])
            .attr("aws", provider("hashicorp/aws", "~> 5.0"))
            .attr("kubernetes", provider("hashicorp/kubernetes", "~> 2.23")),
    )
}

fn refs(items: &[&str]) -> Expr {
    Expr::List(items.iter().map(|r| Expr::reference(*r)).collect())
}

fn cluster() -> Block {
    Block::new("resource", &["aws_eks_cluster", "wordpress_cluster"])
        .attr("name", "wordpress-cluster")
        .attr("role_arn", Expr::reference("aws_iam_role.cluster_role.arn"))
        .attr("version", "1.28")
        .blank()
        .block(
            Block::new("vpc_config", &[])
                .attr("subnet_ids", Expr::reference("aws_subnet.private[*].id")),
        )
        .blank()
        .attr(
            "depends_on",
            refs(&["aws_iam_role_policy_attachment.cluster_AmazonEKSClusterPolicy"]),
        )
}

fn node_group(nodes: u32) -> Block {
    Block::new("resource", &["aws_eks_node_group", "wordpress_nodes"])
        .attr(
            "cluster_name",
            Expr::reference("aws_eks_cluster.wordpress_cluster.name"),
        )
        .attr("node_group_name", "wordpress-nodes")
        .attr("node_role_arn", Expr::reference("aws_iam_role.node_role.arn"))
        .attr("subnet_ids", Expr::reference("aws_subnet.private[*].id"))
        .blank()
        .block(
            Block::new("scaling_config", &[])
                .attr("desired_size", nodes)
                .attr("max_size", nodes.max(NODE_GROUP_MAX))
                .attr("min_size", nodes.min(1)),
        )
        .blank()
        .attr("instance_types", Expr::List(vec!["t3.medium".into()]))
        .blank()
        .attr(
            "depends_on",
            refs(&[
                "aws_iam_role_policy_attachment.node_AmazonEKSWorkerNodePolicy",
                "aws_iam_role_policy_attachment.node_AmazonEKS_CNI_Policy",
                "aws_iam_role_policy_attachment.node_AmazonEC2ContainerRegistryReadOnly",
            ]),
        )
}

fn mysql() -> Block {
    Block::new("resource", &["aws_db_instance", "wordpress_mysql"])
        .attr("identifier", "wordpress-mysql")
        .blank()
        .attr("engine", "mysql")
        .attr("engine_version", "8.0")
        .attr("instance_class", "db.t3.micro")
        .blank()
        .attr("allocated_storage", 20u32)
        .attr("max_allocated_storage", 100u32)
        .blank()
        .attr("db_name", "wordpress")
        .attr("username", "admin")
        .attr("password", Expr::reference("var.mysql_password"))
        .blank()
        .attr(
            "vpc_security_group_ids",
            refs(&["aws_security_group.rds.id"]),
        )
        .attr(
            "db_subnet_group_name",
            Expr::reference("aws_db_subnet_group.main.name"),
        )
        .blank()
        .attr("backup_retention_period", 7u32)
        .attr("backup_window", "03:00-04:00")
        .attr("maintenance_window", "sun:04:00-sun:05:00")
        .blank()
        .attr("skip_final_snapshot", true)
}

fn mongodb() -> Block {
    Block::new("resource", &["aws_docdb_cluster", "wordpress_mongodb"])
        .attr("cluster_identifier", "wordpress-mongodb")
        .attr("engine", "docdb")
        .attr("master_username", "admin")
        .attr("master_password", Expr::reference("var.mongodb_password"))
        .attr("backup_retention_period", 7u32)
        .attr("preferred_backup_window", "07:00-09:00")
        .attr("skip_final_snapshot", true)
}

/// Replica count of every service in the set, in insertion order.
fn replica_locals(services: &[ServiceRecord]) -> Block {
    Block::new("locals", &[]).attr(
        "service_replicas",
        Expr::Object(
            services
                .iter()
                .map(|s| (s.name.clone(), Expr::from(s.replicas)))
                .collect(),
        ),
    )
}

fn variable(name: &str, description: &str, default: Option<&str>) -> Block {
    let block = Block::new("variable", &[name])
        .attr("description", description)
        .attr("type", Expr::reference("string"));
    match default {
        Some(default) => block.attr("default", default),
        None => block.attr("sensitive", true),
    }
}

fn output(name: &str, value: &str) -> Block {
    Block::new("output", &[name]).attr("value", Expr::reference(value))
}

pub fn render(input: &RenderInput<'_>) -> String {
    let mut doc = Document::default();
    doc.push(providers());
    doc.push(Block::new("provider", &["aws"]).attr("region", Expr::reference("var.aws_region")));
    doc.push_commented("Workload replicas", replica_locals(input.services));
    doc.push_commented("EKS Cluster", cluster());
    doc.push_commented("Node Group", node_group(input.nodes));
    doc.push_commented("RDS MySQL Instance", mysql());
    doc.push_commented("DocumentDB for MongoDB", mongodb());
    doc.push(variable("aws_region", "AWS region", Some("us-west-2")));
    doc.push(variable("mysql_password", "MySQL admin password", None));
    doc.push(variable("mongodb_password", "MongoDB admin password", None));
    doc.push(output("cluster_endpoint", "aws_eks_cluster.wordpress_cluster.endpoint"));
    doc.push(output("mysql_endpoint", "aws_db_instance.wordpress_mysql.endpoint"));
    doc.push(output("mongodb_endpoint", "aws_docdb_cluster.wordpress_mongodb.endpoint"));

    let mut out = String::new();
    out.push_str("# Terraform Configuration for WordPress Stack\n");
    out.push_str(&header_timestamp(input));
    out.push_str(&format!(
        "# Current Replicas: WordPress({}), MySQL({})\n\n",
        replicas_of(input.services, "wordpress"),
        replicas_of(input.services, "mysql"),
    ));
    out.push_str(&doc.to_hcl());
    out
}
