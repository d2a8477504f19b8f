//! End-to-end Fargate service tests against the public API

use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use stratus_appscaling::{
    CronOptions, Schedule, ScalingInterval, ScalingSchedule, StepScalingProps,
};
use stratus_assert::{assert_has_resource, assert_has_resource_like, resource_count_of_type};
use stratus_core::{Metric, Stack, SynthError, Template};
use stratus_ec2::{SecurityGroup, SecurityGroupProps, SubnetType, Vpc, VpcProps};
use stratus_elb::{AddTargetsProps, ApplicationListenerProps, ApplicationLoadBalancer, ApplicationLoadBalancerProps};
use stratus_ecs::{
    Capacity, CloudMapNamespaceProps, CloudMapOptions, Cluster, ClusterProps, Compatibility,
    ContainerDefinitionProps, ContainerImage, DnsRecordType, FargateService, FargateServiceProps,
    FargateTaskDefinition, FargateTaskDefinitionProps, NetworkMode, PortMapping, Repository,
    RequestCountScalingProps, TaskDefinition, TaskDefinitionProps, TrackCustomMetricProps,
    UtilizationScalingProps,
};

fn web_container() -> ContainerDefinitionProps {
    ContainerDefinitionProps::new(ContainerImage::from_registry("amazon/amazon-ecs-sample"))
}

fn fixture(stack: &Stack) -> (Cluster, FargateTaskDefinition) {
    let vpc = Vpc::new(stack, "Vpc", VpcProps::default()).unwrap();
    let cluster = Cluster::new(stack, "Cluster", ClusterProps::new(&vpc)).unwrap();
    let task_definition = FargateTaskDefinition::new(
        stack,
        "FargateTaskDef",
        FargateTaskDefinitionProps::default(),
    )
    .unwrap();
    task_definition
        .add_container("web", web_container())
        .unwrap();
    (cluster, task_definition)
}

fn subnet_refs(template: &Template, paths: [&str; 2]) -> serde_json::Value {
    let ids: Vec<_> = paths
        .iter()
        .map(|path| {
            let id = template.logical_id(&path.parse().unwrap()).unwrap();
            json!({ "Ref": id })
        })
        .collect();
    json!(ids)
}

#[test]
fn test_default_service_renders_full_shape() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();

    let template = stack.synth().unwrap();
    let cluster_id = template.logical_id(cluster.path()).unwrap();
    let task_def_id = template.logical_id(task_definition.path()).unwrap();
    let group_id = template
        .logical_id(service.security_group().path())
        .unwrap();

    assert_has_resource(
        &template,
        "AWS::ECS::Service",
        &json!({
            "Cluster": { "Ref": cluster_id },
            "DeploymentConfiguration": { "MaximumPercent": 200, "MinimumHealthyPercent": 50 },
            "DesiredCount": 1,
            "LaunchType": "FARGATE",
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": "DISABLED",
                    "SecurityGroups": [{ "Fn::GetAtt": [group_id, "GroupId"] }],
                    "Subnets": subnet_refs(&template, ["Vpc/PrivateSubnet1", "Vpc/PrivateSubnet2"]),
                },
            },
            "TaskDefinition": { "Ref": task_def_id },
        }),
    );
    let service_resource = template
        .resource(template.logical_id(service.path()).unwrap())
        .unwrap();
    assert!(service_resource["Properties"]
        .get("HealthCheckGracePeriodSeconds")
        .is_none());
    assert!(service_resource["Properties"].get("LoadBalancers").is_none());

    assert_has_resource_like(
        &template,
        "AWS::ECS::TaskDefinition",
        &json!({
            "ContainerDefinitions": [{
                "Essential": true,
                "Image": "amazon/amazon-ecs-sample",
                "Name": "web",
            }],
            "Cpu": "256",
            "Memory": "512",
            "NetworkMode": "awsvpc",
            "RequiresCompatibilities": ["FARGATE"],
        }),
    );

    assert_has_resource(
        &template,
        "AWS::EC2::SecurityGroup",
        &json!({
            "GroupDescription": "FargateService/SecurityGroup",
            "SecurityGroupEgress": [{
                "CidrIp": "0.0.0.0/0",
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }],
        }),
    );
}

#[test]
fn test_all_service_properties_render() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    cluster
        .add_default_cloud_map_namespace(CloudMapNamespaceProps::private("foo.com"))
        .unwrap();
    let security_group = SecurityGroup::new(
        &stack,
        "Bob",
        SecurityGroupProps {
            description: Some("Example".to_owned()),
            group_name: Some("Bingo".to_owned()),
            ..SecurityGroupProps::new(cluster.vpc())
        },
    )
    .unwrap();

    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.desired_count = Some(2);
    props.assign_public_ip = true;
    props.health_check_grace_period = Some(Duration::from_secs(10));
    props.max_healthy_percent = Some(150);
    props.min_healthy_percent = Some(55);
    props.security_group = Some(security_group);
    props.service_name = Some("bonjour".to_owned());
    props.cloud_map_options = Some(CloudMapOptions {
        name: Some("myapp".to_owned()),
        ..CloudMapOptions::default()
    });
    let service = FargateService::new(&stack, "FargateService", props).unwrap();

    let template = stack.synth().unwrap();
    let group_id = template
        .logical_id(service.security_group().path())
        .unwrap();
    let registry_id = template
        .logical_id(&service.path().child("CloudmapService"))
        .unwrap();

    assert_has_resource(
        &template,
        "AWS::ECS::Service",
        &json!({
            "DeploymentConfiguration": { "MaximumPercent": 150, "MinimumHealthyPercent": 55 },
            "DesiredCount": 2,
            "HealthCheckGracePeriodSeconds": 10,
            "LaunchType": "FARGATE",
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": "ENABLED",
                    "SecurityGroups": [{ "Fn::GetAtt": [group_id, "GroupId"] }],
                    "Subnets": subnet_refs(&template, ["Vpc/PublicSubnet1", "Vpc/PublicSubnet2"]),
                },
            },
            "ServiceName": "bonjour",
            "ServiceRegistries": [{ "RegistryArn": { "Fn::GetAtt": [registry_id, "Arn"] } }],
        }),
    );
    assert_eq!(service.security_group().path().to_string(), "Bob");
}

#[test]
fn test_subnet_selection_override_beats_address_visibility() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.vpc_subnets = Some(SubnetType::Public);
    FargateService::new(&stack, "FargateService", props).unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ECS::Service",
        &json!({
            "NetworkConfiguration": {
                "AwsvpcConfiguration": {
                    "AssignPublicIp": "DISABLED",
                    "Subnets": subnet_refs(&template, ["Vpc/PublicSubnet1", "Vpc/PublicSubnet2"]),
                },
            },
        }),
    );
}

#[test]
fn test_service_over_container_less_task_definition_is_rejected() {
    let stack = Stack::new();
    let vpc = Vpc::new(&stack, "Vpc", VpcProps::default()).unwrap();
    let cluster = Cluster::new(&stack, "Cluster", ClusterProps::new(&vpc)).unwrap();
    let task_definition = FargateTaskDefinition::new(
        &stack,
        "FargateTaskDef",
        FargateTaskDefinitionProps::default(),
    )
    .unwrap();

    let err = FargateService::new(
        &stack,
        "FargateService",
        FargateServiceProps::new(&cluster, &task_definition),
    )
    .unwrap_err();
    assert!(matches!(err, SynthError::Configuration { .. }));
    assert!(err
        .to_string()
        .contains("Supplied TaskDefinition has no containers"));
}

#[test]
fn test_ec2_task_definition_is_rejected() {
    let stack = Stack::new();
    let (cluster, _) = fixture(&stack);
    let ec2_task_definition = TaskDefinition::new(
        &stack,
        "Ec2TaskDef",
        TaskDefinitionProps {
            compatibility: Compatibility::Ec2,
            network_mode: NetworkMode::Bridge,
            cpu: None,
            memory_mib: None,
        },
    )
    .unwrap();
    ec2_task_definition
        .add_container("web", web_container())
        .unwrap();

    let err = FargateService::new(
        &stack,
        "FargateService",
        FargateServiceProps::new(&cluster, &ec2_task_definition),
    )
    .unwrap_err();
    assert!(matches!(err, SynthError::Incompatible { .. }));
    assert!(err
        .to_string()
        .contains("Supplied TaskDefinition is not configured for compatibility with Fargate"));
}

#[test]
fn test_explicit_zero_minimum_healthy_percent_is_preserved() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.min_healthy_percent = Some(0);
    FargateService::new(&stack, "FargateService", props).unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ECS::Service",
        &json!({
            "DeploymentConfiguration": { "MaximumPercent": 200, "MinimumHealthyPercent": 0 },
        }),
    );
}

#[test]
fn test_target_group_attachment_renders_load_balancers() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    task_definition
        .default_container()
        .unwrap()
        .add_port_mappings([PortMapping::new(8080)])
        .unwrap();
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();

    let balancer = ApplicationLoadBalancer::new(
        &stack,
        "lb",
        ApplicationLoadBalancerProps::new(cluster.vpc()),
    )
    .unwrap();
    let listener = balancer
        .add_listener("listener", ApplicationListenerProps { port: 80 })
        .unwrap();
    let target_group = listener
        .add_targets(
            "web",
            AddTargetsProps {
                port: 80,
                targets: vec![&service],
            },
        )
        .unwrap();

    let template = stack.synth().unwrap();
    let target_group_id = template.logical_id(target_group.path()).unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ECS::Service",
        &json!({
            "HealthCheckGracePeriodSeconds": 60,
            "LoadBalancers": [{
                "ContainerName": "web",
                "ContainerPort": 8080,
                "TargetGroupArn": { "Ref": target_group_id },
            }],
        }),
    );
    assert_has_resource_like(
        &template,
        "AWS::ElasticLoadBalancingV2::Listener",
        &json!({
            "DefaultActions": [{ "TargetGroupArn": { "Ref": target_group_id }, "Type": "forward" }],
            "Port": 80,
            "Protocol": "HTTP",
        }),
    );
    assert_eq!(
        resource_count_of_type(&template, "AWS::ElasticLoadBalancingV2::TargetGroup"),
        1
    );
}

#[test]
fn test_explicit_grace_period_wins_over_attachment_default() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    task_definition
        .default_container()
        .unwrap()
        .add_port_mappings([PortMapping::new(8080)])
        .unwrap();
    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.health_check_grace_period = Some(Duration::from_secs(10));
    let service = FargateService::new(&stack, "FargateService", props).unwrap();

    let balancer = ApplicationLoadBalancer::new(
        &stack,
        "lb",
        ApplicationLoadBalancerProps::new(cluster.vpc()),
    )
    .unwrap();
    let listener = balancer
        .add_listener("listener", ApplicationListenerProps { port: 80 })
        .unwrap();
    listener
        .add_targets(
            "web",
            AddTargetsProps {
                port: 80,
                targets: vec![&service],
            },
        )
        .unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ECS::Service",
        &json!({ "HealthCheckGracePeriodSeconds": 10 }),
    );
}

#[test]
fn test_task_count_target_composes_resource_id() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    service.auto_scale_task_count(Capacity::up_to(10)).unwrap();

    let template = stack.synth().unwrap();
    let cluster_id = template.logical_id(cluster.path()).unwrap();
    let service_id = template.logical_id(service.path()).unwrap();
    assert_has_resource(
        &template,
        "AWS::ApplicationAutoScaling::ScalableTarget",
        &json!({
            "MaxCapacity": 10,
            "MinCapacity": 1,
            "ResourceId": { "Fn::Join": ["", [
                "service/",
                { "Ref": cluster_id },
                "/",
                { "Fn::GetAtt": [service_id, "Name"] },
            ]]},
            "ScalableDimension": "ecs:service:DesiredCount",
            "ServiceNamespace": "ecs",
        }),
    );
}

#[test]
fn test_second_task_count_scaling_is_rejected() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    let err = service
        .auto_scale_task_count(Capacity::up_to(20))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("AutoScaling of task count already enabled"));
}

#[test]
fn test_scheduled_scaling_renders_cron_expression() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let scaling = service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    scaling
        .scale_on_schedule(
            "ScaleOnSchedule",
            ScalingSchedule {
                schedule: Schedule::cron(CronOptions {
                    hour: Some("8".to_owned()),
                    minute: Some("0".to_owned()),
                    ..CronOptions::default()
                }),
                min_capacity: Some(10),
                max_capacity: None,
            },
        )
        .unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ApplicationAutoScaling::ScalableTarget",
        &json!({
            "ScheduledActions": [{
                "ScalableTargetAction": { "MinCapacity": 10 },
                "Schedule": "cron(0 8 * * ? *)",
                "ScheduledActionName": "ScaleOnSchedule",
            }],
        }),
    );
}

#[test]
fn test_step_scaling_splits_into_two_policies() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let scaling = service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    scaling
        .scale_on_metric(
            "ScaleOnLoad",
            StepScalingProps::new(
                service.metric_cpu_utilization(),
                vec![
                    ScalingInterval {
                        lower: None,
                        upper: Some(10.0),
                        change: -1,
                    },
                    ScalingInterval {
                        lower: Some(50.0),
                        upper: None,
                        change: 3,
                    },
                ],
            ),
        )
        .unwrap();

    let template = stack.synth().unwrap();
    assert_eq!(
        resource_count_of_type(&template, "AWS::ApplicationAutoScaling::ScalingPolicy"),
        2
    );
    let target_id = template
        .logical_id(&service.path().child("TaskCountTarget"))
        .unwrap();
    assert_has_resource(
        &template,
        "AWS::ApplicationAutoScaling::ScalingPolicy",
        &json!({
            "PolicyType": "StepScaling",
            "ScalingTargetId": { "Ref": target_id },
            "StepScalingPolicyConfiguration": {
                "AdjustmentType": "ChangeInCapacity",
                "MetricAggregationType": "Average",
                "StepAdjustments": [{ "MetricIntervalUpperBound": 10, "ScalingAdjustment": -1 }],
            },
        }),
    );
    assert_has_resource_like(
        &template,
        "AWS::ApplicationAutoScaling::ScalingPolicy",
        &json!({
            "StepScalingPolicyConfiguration": {
                "StepAdjustments": [{ "MetricIntervalLowerBound": 50, "ScalingAdjustment": 3 }],
            },
        }),
    );
}

#[test]
fn test_utilization_tracking_policies_render() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let scaling = service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    scaling
        .scale_on_cpu_utilization("ScaleOnCpu", UtilizationScalingProps::percent(30.0))
        .unwrap();
    scaling
        .scale_on_memory_utilization("ScaleOnMemory", UtilizationScalingProps::percent(60.0))
        .unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ApplicationAutoScaling::ScalingPolicy",
        &json!({
            "PolicyType": "TargetTrackingScaling",
            "TargetTrackingScalingPolicyConfiguration": {
                "PredefinedMetricSpecification": {
                    "PredefinedMetricType": "ECSServiceAverageCPUUtilization",
                },
                "TargetValue": 30,
            },
        }),
    );
    assert_has_resource_like(
        &template,
        "AWS::ApplicationAutoScaling::ScalingPolicy",
        &json!({
            "TargetTrackingScalingPolicyConfiguration": {
                "PredefinedMetricSpecification": {
                    "PredefinedMetricType": "ECSServiceAverageMemoryUtilization",
                },
                "TargetValue": 60,
            },
        }),
    );
}

#[test]
fn test_request_count_scaling_builds_resource_label() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    task_definition
        .default_container()
        .unwrap()
        .add_port_mappings([PortMapping::new(8080)])
        .unwrap();
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let balancer = ApplicationLoadBalancer::new(
        &stack,
        "lb",
        ApplicationLoadBalancerProps::new(cluster.vpc()),
    )
    .unwrap();
    let listener = balancer
        .add_listener("listener", ApplicationListenerProps { port: 80 })
        .unwrap();
    let target_group = listener
        .add_targets(
            "web",
            AddTargetsProps {
                port: 80,
                targets: vec![&service],
            },
        )
        .unwrap();
    let scaling = service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    scaling
        .scale_on_request_count(
            "ScaleOnRequests",
            RequestCountScalingProps {
                requests_per_target: 1000.0,
                target_group: target_group.clone(),
            },
        )
        .unwrap();

    let template = stack.synth().unwrap();
    let listener_id = template.logical_id(listener.path()).unwrap();
    let target_group_id = template.logical_id(target_group.path()).unwrap();
    let split = json!({ "Fn::Split": ["/", { "Ref": listener_id }] });
    assert_has_resource_like(
        &template,
        "AWS::ApplicationAutoScaling::ScalingPolicy",
        &json!({
            "TargetTrackingScalingPolicyConfiguration": {
                "PredefinedMetricSpecification": {
                    "PredefinedMetricType": "ALBRequestCountPerTarget",
                    "ResourceLabel": { "Fn::Join": ["", [
                        { "Fn::Select": [1, split.clone()] },
                        "/",
                        { "Fn::Select": [2, split.clone()] },
                        "/",
                        { "Fn::Select": [3, split.clone()] },
                        "/",
                        { "Fn::GetAtt": [target_group_id, "TargetGroupFullName"] },
                    ]]},
                },
                "TargetValue": 1000,
            },
        }),
    );
}

#[test]
fn test_custom_metric_tracking_renders_metric_description() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let scaling = service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    scaling
        .scale_to_track_custom_metric(
            "ScaleOnQueueDepth",
            TrackCustomMetricProps {
                metric: Metric::new("Demo", "QueueDepth").with_dimension("QueueName", "work"),
                target_value: 5.0,
                scale_in_cooldown: None,
                scale_out_cooldown: None,
            },
        )
        .unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ApplicationAutoScaling::ScalingPolicy",
        &json!({
            "TargetTrackingScalingPolicyConfiguration": {
                "CustomizedMetricSpecification": {
                    "Dimensions": [{ "Name": "QueueName", "Value": "work" }],
                    "MetricName": "QueueDepth",
                    "Namespace": "Demo",
                    "Statistic": "Average",
                },
                "TargetValue": 5,
            },
        }),
    );
}

#[test]
fn test_service_discovery_requires_a_namespace() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.cloud_map_options = Some(CloudMapOptions::default());
    let err = FargateService::new(&stack, "FargateService", props).unwrap_err();
    assert!(matches!(err, SynthError::MissingDependency { .. }));
    assert!(err.to_string().contains(
        "Cannot enable service discovery if a Cloudmap Namespace has not been created in the cluster."
    ));
}

#[test]
fn test_service_discovery_publishes_address_records() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let namespace = cluster
        .add_default_cloud_map_namespace(CloudMapNamespaceProps::private("foo.com"))
        .unwrap();
    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.cloud_map_options = Some(CloudMapOptions {
        name: Some("myApp".to_owned()),
        ..CloudMapOptions::default()
    });
    FargateService::new(&stack, "FargateService", props).unwrap();

    let template = stack.synth().unwrap();
    let namespace_id = template.logical_id(namespace.path()).unwrap();
    assert_has_resource(
        &template,
        "AWS::ServiceDiscovery::PrivateDnsNamespace",
        &json!({ "Name": "foo.com" }),
    );
    assert_has_resource(
        &template,
        "AWS::ServiceDiscovery::Service",
        &json!({
            "DnsConfig": {
                "DnsRecords": [{ "TTL": 60, "Type": "A" }],
                "NamespaceId": { "Fn::GetAtt": [namespace_id, "Id"] },
                "RoutingPolicy": "MULTIVALUE",
            },
            "HealthCheckCustomConfig": { "FailureThreshold": 1 },
            "Name": "myApp",
            "NamespaceId": { "Fn::GetAtt": [namespace_id, "Id"] },
        }),
    );
}

#[test]
fn test_service_discovery_publishes_srv_records() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    cluster
        .add_default_cloud_map_namespace(CloudMapNamespaceProps::private("foo.com"))
        .unwrap();
    let mut props = FargateServiceProps::new(&cluster, &task_definition);
    props.cloud_map_options = Some(CloudMapOptions {
        name: Some("myApp".to_owned()),
        dns_record_type: DnsRecordType::Srv,
        ..CloudMapOptions::default()
    });
    FargateService::new(&stack, "FargateService", props).unwrap();

    let template = stack.synth().unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ServiceDiscovery::Service",
        &json!({
            "DnsConfig": { "DnsRecords": [{ "TTL": 60, "Type": "SRV" }] },
        }),
    );
}

#[test]
fn test_service_metrics_resolve_with_service_dimensions() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let metric = service.metric_cpu_utilization();

    let template = stack.synth().unwrap();
    let cluster_id = template.logical_id(cluster.path()).unwrap();
    let service_id = template.logical_id(service.path()).unwrap();
    assert_eq!(
        template.resolve(&metric.to_expr()).unwrap(),
        json!({
            "dimensions": {
                "ClusterName": { "Ref": cluster_id },
                "ServiceName": { "Fn::GetAtt": [service_id, "Name"] },
            },
            "metricName": "CPUUtilization",
            "namespace": "AWS/ECS",
            "period": 300,
            "statistic": "Average",
        })
    );
}

#[test]
fn test_ecr_images_wire_up_the_execution_role() {
    let stack = Stack::new();
    let vpc = Vpc::new(&stack, "Vpc", VpcProps::default()).unwrap();
    let cluster = Cluster::new(&stack, "Cluster", ClusterProps::new(&vpc)).unwrap();
    let repository = Repository::new(&stack, "Repo").unwrap();
    let task_definition = FargateTaskDefinition::new(
        &stack,
        "FargateTaskDef",
        FargateTaskDefinitionProps::default(),
    )
    .unwrap();
    task_definition
        .add_container(
            "web",
            ContainerDefinitionProps::new(ContainerImage::from_ecr_repository(&repository, "latest")),
        )
        .unwrap();
    FargateService::new(
        &stack,
        "FargateService",
        FargateServiceProps::new(&cluster, &task_definition),
    )
    .unwrap();

    let template = stack.synth().unwrap();
    let execution_role = task_definition.execution_role().unwrap();
    let role_id = template.logical_id(execution_role.path()).unwrap();
    let repo_id = template.logical_id(repository.path()).unwrap();
    assert_has_resource_like(
        &template,
        "AWS::ECS::TaskDefinition",
        &json!({ "ExecutionRoleArn": { "Fn::GetAtt": [role_id, "Arn"] } }),
    );
    assert_has_resource_like(
        &template,
        "AWS::IAM::Policy",
        &json!({
            "PolicyDocument": {
                "Statement": [
                    {
                        "Action": [
                            "ecr:BatchCheckLayerAvailability",
                            "ecr:GetDownloadUrlForLayer",
                            "ecr:BatchGetImage",
                        ],
                        "Effect": "Allow",
                        "Resource": [{ "Fn::GetAtt": [repo_id, "Arn"] }],
                    },
                    {
                        "Action": ["ecr:GetAuthorizationToken"],
                        "Effect": "Allow",
                        "Resource": ["*"],
                    },
                ],
            },
            "Roles": [{ "Ref": role_id }],
        }),
    );
    let split = json!({ "Fn::Split": [":", { "Fn::GetAtt": [repo_id, "Arn"] }] });
    assert_has_resource_like(
        &template,
        "AWS::ECS::TaskDefinition",
        &json!({
            "ContainerDefinitions": [{
                "Essential": true,
                "Image": { "Fn::Join": ["", [
                    { "Fn::Select": [4, split.clone()] },
                    ".dkr.ecr.",
                    { "Fn::Select": [3, split.clone()] },
                    ".",
                    { "Ref": "AWS::URLSuffix" },
                    "/",
                    { "Ref": repo_id },
                    ":",
                    "latest",
                ]]},
                "Name": "web",
            }],
        }),
    );
}

#[test]
fn test_resynthesis_is_stable() {
    let stack = Stack::new();
    let (cluster, task_definition) = fixture(&stack);
    let service =
        FargateService::new(&stack, "FargateService", FargateServiceProps::new(&cluster, &task_definition))
            .unwrap();
    let scaling = service.auto_scale_task_count(Capacity::up_to(10)).unwrap();
    scaling
        .scale_on_cpu_utilization("ScaleOnCpu", UtilizationScalingProps::percent(30.0))
        .unwrap();

    let first = stack.synth().unwrap();
    let second = stack.synth().unwrap();
    assert_eq!(first.to_canonical_json(), second.to_canonical_json());
}

#[test]
fn test_identical_stacks_synthesize_identically() {
    let build = || {
        let stack = Stack::new();
        let (cluster, task_definition) = fixture(&stack);
        FargateService::new(
            &stack,
            "FargateService",
            FargateServiceProps::new(&cluster, &task_definition),
        )
        .unwrap();
        stack.synth().unwrap().to_canonical_json()
    };
    assert_eq!(build(), build());
}

proptest! {
    #[test]
    fn prop_desired_count_renders_verbatim(desired in 1u32..500) {
        let stack = Stack::new();
        let (cluster, task_definition) = fixture(&stack);
        let mut props = FargateServiceProps::new(&cluster, &task_definition);
        props.desired_count = Some(desired);
        FargateService::new(&stack, "FargateService", props).unwrap();
        let template = stack.synth().unwrap();
        let matched = stratus_assert::have_resource_like(
            &template,
            "AWS::ECS::Service",
            &json!({ "DesiredCount": desired }),
        );
        prop_assert!(matched, "DesiredCount {} not rendered", desired);
    }

    #[test]
    fn prop_deployment_bounds_render_verbatim(min in 0u32..100, span in 0u32..200) {
        let stack = Stack::new();
        let (cluster, task_definition) = fixture(&stack);
        let mut props = FargateServiceProps::new(&cluster, &task_definition);
        props.min_healthy_percent = Some(min);
        props.max_healthy_percent = Some(100 + span);
        FargateService::new(&stack, "FargateService", props).unwrap();
        let template = stack.synth().unwrap();
        let matched = stratus_assert::have_resource_like(
            &template,
            "AWS::ECS::Service",
            &json!({
                "DeploymentConfiguration": {
                    "MaximumPercent": 100 + span,
                    "MinimumHealthyPercent": min,
                },
            }),
        );
        prop_assert!(matched, "deployment bounds {}/{} not rendered", min, 100 + span);
    }
}
